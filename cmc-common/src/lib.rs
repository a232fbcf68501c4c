//! Cminus MIPS Backend - Common Types and Utilities
//! 
//! This crate contains the error type and label definitions shared by the
//! code generator and the driver.

pub mod error;
pub mod types;

pub use error::{CodegenError, Result};
pub use types::{Label, LabelGenerator, LabelId};
