//! Cminus MIPS Backend - Code Generation
//! 
//! This crate turns the code-generation requests of a single-pass front end
//! into MIPS assembly text. It includes:
//! 
//! - The register pool (18 scratch registers, no spilling)
//! - The buffer stack that defers the text of unfinished control constructs
//! - The instruction emitter and program framing
//! - `if`/`else` and `while` helpers built on the buffer stack

pub mod asm;
pub mod buffer;
pub mod context;
pub mod control;
pub mod emit;
pub mod regalloc;
pub mod sink;
pub mod strings;

pub use asm::{AsmInst, BinOp, Reg};
pub use buffer::{BufferStack, Construct, Level};
pub use context::{CodegenContext, CodegenOptions};
pub use regalloc::RegisterPool;
pub use sink::Sink;
pub use strings::{StringLiterals, StringTable};
pub use cmc_common::{CodegenError, Label, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_code_generation() {
        let mut ctx = CodegenContext::new(Vec::new());
        ctx.prolog().unwrap();
        let r = ctx.alloc_reg().unwrap();
        ctx.issue_li(r, 42).unwrap();
        ctx.write_reg_value(r).unwrap();
        ctx.free_reg(r).unwrap();
        ctx.finish(&StringLiterals::new()).unwrap();

        let asm = String::from_utf8(ctx.into_output().unwrap()).unwrap();
        assert!(asm.contains("main: nop"));
        assert!(asm.contains("li $t0, 42"));
        assert!(asm.contains("move $a0, $t0"));
        assert!(asm.ends_with("\tli $v0, 10\n\tsyscall\n.data\n"));
    }
}
