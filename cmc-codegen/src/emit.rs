//! Instruction emission
//!
//! One method per logical instruction. Each builds the `AsmInst` sequence,
//! renders it and appends it to the current sink. None of them allocate or
//! free registers; register lifetime is the caller's business.

use crate::asm::{AsmInst, BinOp, Reg};
use crate::context::CodegenContext;
use crate::strings::{literal_name, StringTable};
use cmc_common::{CodegenError, Label, Result};
use log::debug;
use std::io::Write;

/// Syscall service numbers used by the backend
mod syscall {
    pub const PRINT_INT: i64 = 1;
    pub const PRINT_STRING: i64 = 4;
    pub const READ_INT: i64 = 5;
    pub const EXIT: i64 = 10;
}

/// Data-segment symbol holding `"\n"`
pub const NEWLINE_SYMBOL: &str = ".newline";

impl<W: Write> CodegenContext<W> {
    fn emit(&mut self, note: impl FnOnce() -> String, insts: &[AsmInst]) -> Result<()> {
        let mut text = String::new();
        if self.options.annotate {
            text.push_str(&AsmInst::Comment(note()).line());
        }
        text.extend(insts.iter().map(AsmInst::line));
        self.sink().append(&text)
    }

    /// `dst = lhs <op> rhs`
    pub fn issue_op(&mut self, op: BinOp, dst: Reg, lhs: Reg, rhs: Reg) -> Result<()> {
        self.emit(
            || format!("{} = {} ({}, {})", dst.name(), op.mnemonic(), lhs.name(), rhs.name()),
            &[AsmInst::Op(op, dst, lhs, rhs)],
        )
    }

    /// `dst = src <op> value`
    pub fn issue_op_imm(&mut self, op: BinOp, dst: Reg, src: Reg, value: i64) -> Result<()> {
        self.emit(
            || format!("{} = {} ({}, {})", dst.name(), op.mnemonic(), src.name(), value),
            &[AsmInst::OpImm(op, dst, src, value)],
        )
    }

    /// `dst = *(base + offset)`
    pub fn issue_lw(&mut self, dst: Reg, base: Reg, offset: i64) -> Result<()> {
        self.emit(
            || format!("{} = {}[{}]", dst.name(), base.name(), offset),
            &[AsmInst::Lw(dst, base, offset)],
        )
    }

    /// `*(base + offset) = src`
    pub fn issue_sw(&mut self, src: Reg, base: Reg, offset: i64) -> Result<()> {
        self.emit(
            || format!("{}[{}] = {}", base.name(), offset, src.name()),
            &[AsmInst::Sw(src, base, offset)],
        )
    }

    pub fn issue_li(&mut self, dst: Reg, value: i64) -> Result<()> {
        self.emit(
            || format!("{} = {}", dst.name(), value),
            &[AsmInst::Li(dst, value)],
        )
    }

    /// Load the address of a string label or data symbol
    pub fn issue_la(&mut self, dst: Reg, symbol: &str) -> Result<()> {
        self.emit(
            || format!("{} = {}", dst.name(), symbol),
            &[AsmInst::La(dst, symbol.to_string())],
        )
    }

    pub fn issue_jump(&mut self, target: Label) -> Result<()> {
        self.emit(|| format!("goto {target}"), &[AsmInst::J(target)])
    }

    /// Branch to `target` when `lhs == rhs`
    pub fn issue_beq(&mut self, lhs: Reg, rhs: Reg, target: Label) -> Result<()> {
        self.emit(
            || format!("if {} == {} goto {}", lhs.name(), rhs.name(), target),
            &[AsmInst::Beq(lhs, rhs, target)],
        )
    }

    pub fn issue_move(&mut self, dst: Reg, src: Reg) -> Result<()> {
        self.emit(
            || format!("{} = {}", dst.name(), src.name()),
            &[AsmInst::Move(dst, src)],
        )
    }

    pub fn place_label(&mut self, label: Label) -> Result<()> {
        self.sink().append(&AsmInst::Label(label).line())
    }

    // ===== I/O syscalls =====

    pub fn write_new_line(&mut self) -> Result<()> {
        self.emit(
            || "print new line".to_string(),
            &[
                AsmInst::La(Reg::A0, NEWLINE_SYMBOL.to_string()),
                AsmInst::Li(Reg::V0, syscall::PRINT_STRING),
                AsmInst::Syscall,
            ],
        )
    }

    pub fn write_const_int(&mut self, value: i64) -> Result<()> {
        self.emit(
            || "print constant value".to_string(),
            &[
                AsmInst::Li(Reg::A0, value),
                AsmInst::Li(Reg::V0, syscall::PRINT_INT),
                AsmInst::Syscall,
            ],
        )
    }

    /// Print the integer held in `reg`
    pub fn write_reg_value(&mut self, reg: Reg) -> Result<()> {
        self.emit(
            || "print register content".to_string(),
            &[
                AsmInst::Move(Reg::A0, reg),
                AsmInst::Li(Reg::V0, syscall::PRINT_INT),
                AsmInst::Syscall,
            ],
        )
    }

    /// Print the string whose address is held in `reg`
    pub fn write_const_string(&mut self, reg: Reg) -> Result<()> {
        self.emit(
            || "print constant string".to_string(),
            &[
                AsmInst::Move(Reg::A0, reg),
                AsmInst::Li(Reg::V0, syscall::PRINT_STRING),
                AsmInst::Syscall,
            ],
        )
    }

    /// Read an integer from stdin into `dst`
    pub fn read_int(&mut self, dst: Reg) -> Result<()> {
        self.emit(
            || format!("{} = <stdin>", dst.name()),
            &[
                AsmInst::Li(Reg::V0, syscall::READ_INT),
                AsmInst::Syscall,
                AsmInst::Move(dst, Reg::V0),
            ],
        )
    }

    // ===== Program framing =====

    pub fn prolog(&mut self) -> Result<()> {
        self.emit(
            || "prolog".to_string(),
            &[
                AsmInst::Directive(".data".to_string()),
                AsmInst::Directive(format!("{NEWLINE_SYMBOL}: .asciiz \"\\n\"")),
                AsmInst::Directive(".text".to_string()),
                AsmInst::Directive(".globl main".to_string()),
                AsmInst::Directive("main: nop".to_string()),
            ],
        )
    }

    fn ensure_unbuffered(&self) -> Result<()> {
        match self.stack.depth() {
            0 => Ok(()),
            depth => Err(CodegenError::UnclosedLevels(depth)),
        }
    }

    pub fn epilog(&mut self) -> Result<()> {
        self.ensure_unbuffered()?;
        self.emit(
            || "exit()ing the program".to_string(),
            &[AsmInst::Li(Reg::V0, syscall::EXIT), AsmInst::Syscall],
        )
    }

    /// Write the data section holding every collected string literal
    pub fn emit_string_literals(&mut self, strings: &dyn StringTable) -> Result<()> {
        self.ensure_unbuffered()?;

        let mut section = vec![AsmInst::Directive(".data".to_string())];
        for index in 0..strings.count() {
            let name = literal_name(index);
            let text = strings
                .lookup(&name)
                .ok_or_else(|| CodegenError::MissingStringLiteral(name.clone()))?;
            section.push(AsmInst::Directive(format!("{name}: .asciiz \"{text}\"")));
        }

        debug!("Emitting {} string literal(s)", strings.count());
        self.sink().append_all(&section)
    }

    /// Close the program: exit sequence followed by the string data section
    pub fn finish(&mut self, strings: &dyn StringTable) -> Result<()> {
        self.epilog()?;
        self.emit_string_literals(strings)
    }
}
