//! Common types used throughout the backend

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label identifier for code generation
pub type LabelId = u64;

/// A jump/branch target, rendered as `.L<id>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label(LabelId);

impl Label {
    pub fn id(&self) -> LabelId {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}

/// Label generator for code generation
///
/// Ids are handed out in increasing order and never reused by the same
/// generator.
#[derive(Debug, Clone, Default)]
pub struct LabelGenerator {
    next_id: LabelId,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate a new unique label
    pub fn next(&mut self) -> Label {
        let label = Label(self.next_id);
        self.next_id += 1;
        label
    }

    /// Id the next call to [`LabelGenerator::next`] will return
    pub fn peek(&self) -> LabelId {
        self.next_id
    }

    /// Number of labels issued so far
    pub fn issued(&self) -> u64 {
        self.next_id
    }
}
