//! Error handling for the Cminus MIPS backend
//!
//! Every condition in this module is fatal for the compilation unit that
//! raised it: the generated text is only meaningful when code generation ran
//! to completion. The variants exist so callers (and tests) can tell the
//! failures apart instead of aborting the process from inside the library.

use std::io;
use thiserror::Error;

/// Result alias used throughout the backend
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Main backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("no more registers available (all {0} allocatable registers are busy)")]
    OutOfRegisters(usize),

    #[error("register ${0} is not an allocatable register")]
    NotAllocatable(&'static str),

    #[error("register ${0} was not allocated")]
    DoubleFree(&'static str),

    #[error("buffer stack is empty")]
    EmptyStack,

    #[error("buffer stack is full (limit: {limit} levels)")]
    StackOverflow { limit: usize },

    #[error("cannot merge {requested} levels (stack holds {depth}, need at least 2)")]
    InvalidMergeCount { requested: usize, depth: usize },

    #[error("buffer capacity exceeded: need {needed} bytes, capacity is {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("expected a {expected} level, found {found}")]
    ConstructMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0} buffering level(s) still open at end of program")]
    UnclosedLevels(usize),

    #[error("string literal '{0}' not found in string table")]
    MissingStringLiteral(String),

    #[error("IO error: {message}")]
    Io {
        message: String,
        os_code: Option<i32>,
    },
}

impl CodegenError {
    /// Process exit status for this error.
    ///
    /// IO failures report the underlying OS error code, everything else
    /// exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CodegenError::Io { os_code: Some(code), .. } => *code,
            _ => 1,
        }
    }
}

/// Convert from std::io::Error
impl From<io::Error> for CodegenError {
    fn from(err: io::Error) -> Self {
        CodegenError::Io {
            message: err.to_string(),
            os_code: err.raw_os_error(),
        }
    }
}
