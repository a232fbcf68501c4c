//! Control-Flow Buffer Stack
//!
//! A construct whose final text cannot be written yet (an `if` that may
//! still grow an `else`, a loop body) is generated into its own level
//! instead of the live output. When the construct closes, the innermost
//! levels are merged into their parent, restoring program order through the
//! stack discipline alone.
//!
//! ## Invariants
//!
//! - depth is always within `[0, max_depth]`
//! - a level's text never exceeds its capacity; appends that would are
//!   rejected, never truncated
//! - a failed `merge` leaves the stack exactly as it was

use cmc_common::{CodegenError, Label, Result};
use log::{debug, trace};

/// Default nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default per-level buffer capacity, in bytes
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Which control construct a level belongs to, with its jump targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    /// `if`/`else`: the branch skips to `else_label` when the condition is
    /// false; the then-part jumps to `end_label` over the else-part.
    Conditional {
        else_label: Label,
        end_label: Label,
        in_else: bool,
    },

    /// `while`: `entry` heads the condition test, `exit` follows the body.
    Loop { entry: Label, exit: Label },
}

impl Construct {
    pub fn kind(&self) -> &'static str {
        match self {
            Construct::Conditional { in_else: false, .. } => "conditional",
            Construct::Conditional { in_else: true, .. } => "else",
            Construct::Loop { .. } => "loop",
        }
    }
}

/// One nesting frame of deferred instruction text
#[derive(Debug, Clone)]
pub struct Level {
    construct: Construct,
    text: String,
    capacity: usize,
}

impl Level {
    fn new(construct: Construct, mut text: String, capacity: usize) -> Self {
        text.clear();
        Self { construct, text, capacity }
    }

    pub fn construct(&self) -> &Construct {
        &self.construct
    }

    pub fn construct_mut(&mut self) -> &mut Construct {
        &mut self.construct
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes still available in this level's buffer
    pub fn remaining(&self) -> usize {
        self.capacity - self.text.len()
    }

    /// Append text, failing without side effects if it does not fit
    pub fn append(&mut self, text: &str) -> Result<()> {
        if text.len() > self.remaining() {
            return Err(CodegenError::CapacityExceeded {
                needed: self.text.len() + text.len(),
                capacity: self.capacity,
            });
        }
        self.text.push_str(text);
        Ok(())
    }

    /// Take the text out of the level, leaving it empty
    pub fn take_text(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

/// Bounded stack of buffering levels
#[derive(Debug)]
pub struct BufferStack {
    levels: Vec<Level>,
    max_depth: usize,
    buffer_capacity: usize,

    /// Buffers of destroyed levels, handed to later pushes
    spare: Vec<String>,
}

impl BufferStack {
    pub fn new(max_depth: usize, buffer_capacity: usize) -> Self {
        Self {
            levels: Vec::new(),
            max_depth,
            buffer_capacity,
            spare: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Open a new innermost level for `construct`
    pub fn push(&mut self, construct: Construct) -> Result<()> {
        if self.levels.len() >= self.max_depth {
            return Err(CodegenError::StackOverflow { limit: self.max_depth });
        }

        let buffer = self
            .spare
            .pop()
            .unwrap_or_else(|| String::with_capacity(self.buffer_capacity));
        self.levels.push(Level::new(construct, buffer, self.buffer_capacity));
        debug!("Pushed {} level (depth {})", construct.kind(), self.levels.len());
        Ok(())
    }

    /// Innermost level
    pub fn top(&self) -> Result<&Level> {
        self.levels.last().ok_or(CodegenError::EmptyStack)
    }

    pub fn top_mut(&mut self) -> Result<&mut Level> {
        self.levels.last_mut().ok_or(CodegenError::EmptyStack)
    }

    /// Level directly below the innermost one
    pub fn enclosing(&self) -> Option<&Level> {
        self.levels.iter().rev().nth(1)
    }

    /// Innermost level, if buffering is active
    pub fn innermost_mut(&mut self) -> Option<&mut Level> {
        self.levels.last_mut()
    }

    /// Remove and return the innermost level
    pub fn pop(&mut self) -> Result<Level> {
        let level = self.levels.pop().ok_or(CodegenError::EmptyStack)?;
        debug!("Popped {} level (depth {})", level.construct.kind(), self.levels.len());
        Ok(level)
    }

    /// Collapse the `n` innermost levels into the one `n - 1` below the top
    ///
    /// Each step pops the innermost level and appends its text to the newly
    /// exposed top, so with levels `A`, `B`, `C` (outermost first) the
    /// surviving level holds `A` followed by `B` followed by `C`.
    pub fn merge(&mut self, n: usize) -> Result<()> {
        let depth = self.levels.len();
        if n < 2 || n > depth {
            return Err(CodegenError::InvalidMergeCount { requested: n, depth });
        }

        let needed: usize = self.levels[depth - n..].iter().map(Level::len).sum();
        if needed > self.buffer_capacity {
            return Err(CodegenError::CapacityExceeded {
                needed,
                capacity: self.buffer_capacity,
            });
        }

        for _ in 1..n {
            let mut inner = self.pop()?;
            let outer = self.top_mut()?;
            outer.append(inner.text())?;
            trace!("Merged {} bytes into {} level", inner.len(), outer.construct.kind());
            self.recycle(inner.take_text());
        }

        debug!("Merged {n} levels (depth {})", self.levels.len());
        Ok(())
    }

    /// Hand a destroyed level's buffer back for reuse
    pub fn recycle(&mut self, mut buffer: String) {
        buffer.clear();
        self.spare.push(buffer);
    }

    /// Dump every level, outermost first
    pub fn log_state(&self) {
        trace!("Buffer stack at depth {} of {}", self.levels.len(), self.max_depth);
        for (i, level) in self.levels.iter().enumerate() {
            trace!(
                "  [{i}] {:?}: {}/{} bytes {:?}",
                level.construct,
                level.len(),
                level.capacity,
                level.text
            );
        }
    }

    /// Destroy every level
    pub fn clear(&mut self) {
        while let Some(level) = self.levels.pop() {
            self.recycle(level.text);
        }
    }
}

impl Default for BufferStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_BUFFER_CAPACITY)
    }
}
