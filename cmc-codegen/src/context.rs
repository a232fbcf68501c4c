//! Code generation context
//!
//! Owns everything one compilation run mutates: the register pool, the
//! buffer stack, the label counter and the output stream. Independent
//! contexts can coexist in one process.

use crate::asm::Reg;
use crate::buffer::{BufferStack, Construct, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_DEPTH};
use crate::regalloc::RegisterPool;
use crate::sink::Sink;
use cmc_common::{CodegenError, Label, LabelGenerator, Result};
use log::debug;
use std::io::Write;

/// Options for code generation
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Maximum nesting depth of buffered constructs
    pub max_depth: usize,
    /// Capacity of each buffering level, in bytes
    pub buffer_capacity: usize,
    /// Emit a `#` comment before each logical operation
    pub annotate: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            annotate: false,
        }
    }
}

pub struct CodegenContext<W: Write> {
    pub(crate) out: W,
    pub(crate) pool: RegisterPool,
    pub(crate) stack: BufferStack,
    pub(crate) labels: LabelGenerator,
    pub(crate) options: CodegenOptions,
}

impl<W: Write> CodegenContext<W> {
    pub fn new(out: W) -> Self {
        Self::with_options(out, CodegenOptions::default())
    }

    pub fn with_options(out: W, options: CodegenOptions) -> Self {
        Self {
            out,
            pool: RegisterPool::new(),
            stack: BufferStack::new(options.max_depth, options.buffer_capacity),
            labels: LabelGenerator::new(),
            options,
        }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    pub fn pool(&self) -> &RegisterPool {
        &self.pool
    }

    pub fn stack(&self) -> &BufferStack {
        &self.stack
    }

    pub fn labels(&self) -> &LabelGenerator {
        &self.labels
    }

    /// Where emitted text goes right now
    pub fn sink(&mut self) -> Sink<'_> {
        match self.stack.innermost_mut() {
            Some(level) => Sink::Buffer(level),
            None => Sink::Stream(&mut self.out),
        }
    }

    // ===== Registers =====

    pub fn alloc_reg(&mut self) -> Result<Reg> {
        self.pool.allocate().inspect_err(|_| self.pool.log_state())
    }

    pub fn free_reg(&mut self, reg: Reg) -> Result<()> {
        self.pool.free(reg)
    }

    // ===== Labels =====

    pub fn new_label(&mut self) -> Label {
        let label = self.labels.next();
        debug!("New label {label}");
        label
    }

    // ===== Buffering =====

    pub fn push(&mut self, construct: Construct) -> Result<()> {
        self.stack.push(construct).inspect_err(|_| self.stack.log_state())
    }

    pub fn merge(&mut self, levels: usize) -> Result<()> {
        self.stack.merge(levels).inspect_err(|_| self.stack.log_state())
    }

    /// Pop the innermost level and append its text to whatever encloses it:
    /// the parent level, or the output stream once the stack is empty.
    ///
    /// A parent too small for the text fails the close with the stack
    /// unchanged.
    pub fn close_level(&mut self) -> Result<Construct> {
        self.check_close().inspect_err(|_| self.stack.log_state())?;

        let mut level = self.stack.pop()?;
        let text = level.take_text();
        self.sink().append(&text)?;
        debug!(
            "Closed {} level, flushed {} bytes to {}",
            level.construct().kind(),
            text.len(),
            if self.stack.is_empty() { "output" } else { "parent level" }
        );
        self.stack.recycle(text);
        Ok(*level.construct())
    }

    fn check_close(&self) -> Result<()> {
        let level = self.stack.top()?;
        match self.stack.enclosing() {
            Some(parent) if level.len() > parent.remaining() => Err(CodegenError::CapacityExceeded {
                needed: parent.len() + level.len(),
                capacity: parent.capacity(),
            }),
            _ => Ok(()),
        }
    }

    /// Reinitialise for another run on the same output
    pub fn reset(&mut self) {
        self.pool.reset();
        self.stack.clear();
        self.labels = LabelGenerator::new();
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Tear down and hand back the output stream
    pub fn into_output(mut self) -> Result<W> {
        self.stack.clear();
        self.out.flush()?;
        Ok(self.out)
    }
}
