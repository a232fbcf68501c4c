//! Write target for emitted text
//!
//! The choice between the live output stream and the innermost buffering
//! level is made once, when the sink is built; emitters only ever call
//! [`Sink::append`].

use crate::asm::AsmInst;
use crate::buffer::Level;
use cmc_common::Result;
use log::trace;
use std::io::Write;

pub enum Sink<'a> {
    /// No buffering active: text goes straight to the program output
    Stream(&'a mut dyn Write),

    /// Text accumulates in the innermost buffering level
    Buffer(&'a mut Level),
}

impl Sink<'_> {
    pub fn append(&mut self, text: &str) -> Result<()> {
        match self {
            Sink::Stream(out) => out.write_all(text.as_bytes())?,
            Sink::Buffer(level) => {
                level.append(text)?;
                trace!("Buffered {} bytes ({} used)", text.len(), level.len());
            }
        }
        Ok(())
    }

    /// Append a sequence of instructions, one line each
    pub fn append_all(&mut self, insts: &[AsmInst]) -> Result<()> {
        let text: String = insts.iter().map(AsmInst::line).collect();
        self.append(&text)
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, Sink::Buffer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::Reg;
    use crate::buffer::{BufferStack, Construct};
    use cmc_common::{CodegenError, LabelGenerator};

    #[test]
    fn test_stream_sink() {
        let mut out: Vec<u8> = Vec::new();
        {
            let mut sink = Sink::Stream(&mut out);
            assert!(!sink.is_buffered());
            sink.append_all(&[AsmInst::Li(Reg::T0, 1), AsmInst::Syscall]).unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "\tli $t0, 1\n\tsyscall\n");
    }

    #[test]
    fn test_buffer_sink() {
        let mut labels = LabelGenerator::new();
        let mut stack = BufferStack::new(4, 16);
        stack
            .push(Construct::Loop { entry: labels.next(), exit: labels.next() })
            .unwrap();

        let mut sink = Sink::Buffer(stack.top_mut().unwrap());
        assert!(sink.is_buffered());
        sink.append("\tsyscall\n").unwrap();
        assert_eq!(
            sink.append("\tli $v0, 10\n"),
            Err(CodegenError::CapacityExceeded { needed: 21, capacity: 16 })
        );
        assert_eq!(stack.top().unwrap().text(), "\tsyscall\n");
    }
}
