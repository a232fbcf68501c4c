//! MIPS Assembly Instruction Definitions
//!
//! This module defines the register file and the subset of the MIPS (SPIM
//! dialect) instruction set the backend emits.

use cmc_common::Label;
use std::fmt;

/// MIPS Register Set
///
/// The 32 general purpose registers, in hardware index order:
/// - zero: always 0
/// - at: reserved for the assembler
/// - v0, v1: syscall codes and return values
/// - a0-a3: call and syscall arguments
/// - t0-t7, s0-s7, t8, t9: scratch registers handed out by the allocator
/// - k0, k1: reserved for the OS kernel
/// - gp, fp, sp: global, frame and stack pointers
/// - ra: return address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reg {
    Zero, At,
    V0, V1,
    A0, A1, A2, A3,
    T0, T1, T2, T3, T4, T5, T6, T7,
    S0, S1, S2, S3, S4, S5, S6, S7,
    T8, T9,
    K0, K1,
    Gp, Fp, Sp,
    Ra,
}

impl Reg {
    /// Total number of hardware registers
    pub const COUNT: usize = 32;

    /// All registers, indexed by their hardware number
    pub const ALL: [Reg; Reg::COUNT] = [
        Reg::Zero, Reg::At,
        Reg::V0, Reg::V1,
        Reg::A0, Reg::A1, Reg::A2, Reg::A3,
        Reg::T0, Reg::T1, Reg::T2, Reg::T3, Reg::T4, Reg::T5, Reg::T6, Reg::T7,
        Reg::S0, Reg::S1, Reg::S2, Reg::S3, Reg::S4, Reg::S5, Reg::S6, Reg::S7,
        Reg::T8, Reg::T9,
        Reg::K0, Reg::K1,
        Reg::Gp, Reg::Fp, Reg::Sp,
        Reg::Ra,
    ];

    /// First register of the allocatable block (t0)
    pub const FIRST_ALLOCATABLE: usize = 8;

    /// Last register of the allocatable block (t9)
    pub const LAST_ALLOCATABLE: usize = 25;

    /// Number of allocatable registers
    pub const ALLOCATABLE_COUNT: usize = Self::LAST_ALLOCATABLE - Self::FIRST_ALLOCATABLE + 1;

    /// Hardware index of this register
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Reg> {
        Self::ALL.get(index).copied()
    }

    /// Whether the allocator may hand this register out
    pub fn is_allocatable(self) -> bool {
        (Self::FIRST_ALLOCATABLE..=Self::LAST_ALLOCATABLE).contains(&self.index())
    }

    /// Assembler name, without the `$` sigil
    pub fn name(self) -> &'static str {
        match self {
            Reg::Zero => "zero",
            Reg::At => "at",
            Reg::V0 => "v0",
            Reg::V1 => "v1",
            Reg::A0 => "a0",
            Reg::A1 => "a1",
            Reg::A2 => "a2",
            Reg::A3 => "a3",
            Reg::T0 => "t0",
            Reg::T1 => "t1",
            Reg::T2 => "t2",
            Reg::T3 => "t3",
            Reg::T4 => "t4",
            Reg::T5 => "t5",
            Reg::T6 => "t6",
            Reg::T7 => "t7",
            Reg::S0 => "s0",
            Reg::S1 => "s1",
            Reg::S2 => "s2",
            Reg::S3 => "s3",
            Reg::S4 => "s4",
            Reg::S5 => "s5",
            Reg::S6 => "s6",
            Reg::S7 => "s7",
            Reg::T8 => "t8",
            Reg::T9 => "t9",
            Reg::K0 => "k0",
            Reg::K1 => "k1",
            Reg::Gp => "gp",
            Reg::Fp => "fp",
            Reg::Sp => "sp",
            Reg::Ra => "ra",
        }
    }

    /// Look a register up by name, with or without the `$` sigil
    pub fn from_name(name: &str) -> Option<Reg> {
        let name = name.strip_prefix('$').unwrap_or(name);
        Self::ALL.iter().copied().find(|reg| reg.name() == name)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name())
    }
}

/// Register-register arithmetic, logic and comparison operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Xor,
    Or,
    And,
    // Comparisons (SPIM pseudo-instructions, except slt)
    Slt,
    Sle,
    Sgt,
    Sge,
    Seq,
    Sne,
}

impl BinOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Xor => "xor",
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Slt => "slt",
            BinOp::Sle => "sle",
            BinOp::Sgt => "sgt",
            BinOp::Sge => "sge",
            BinOp::Seq => "seq",
            BinOp::Sne => "sne",
        }
    }

    /// Mnemonic of the register-immediate form
    ///
    /// The comparison pseudo-instructions accept an immediate operand under
    /// their own name; only `slt` has a dedicated `slti`.
    pub fn immediate_mnemonic(self) -> &'static str {
        match self {
            BinOp::Add => "addi",
            BinOp::Sub => "subi",
            BinOp::Mul => "muli",
            BinOp::Div => "divi",
            BinOp::Xor => "xori",
            BinOp::Or => "ori",
            BinOp::And => "andi",
            BinOp::Slt => "slti",
            BinOp::Sle | BinOp::Sgt | BinOp::Sge | BinOp::Seq | BinOp::Sne => self.mnemonic(),
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<BinOp> {
        let op = match name {
            "add" => BinOp::Add,
            "sub" => BinOp::Sub,
            "mul" => BinOp::Mul,
            "div" => BinOp::Div,
            "xor" => BinOp::Xor,
            "or" => BinOp::Or,
            "and" => BinOp::And,
            "slt" => BinOp::Slt,
            "sle" => BinOp::Sle,
            "sgt" => BinOp::Sgt,
            "sge" => BinOp::Sge,
            "seq" => BinOp::Seq,
            "sne" => BinOp::Sne,
            _ => return None,
        };
        Some(op)
    }
}

/// MIPS Assembly Instructions
///
/// Each variant renders as exactly one line of assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    Op(BinOp, Reg, Reg, Reg),     // rd = rs <op> rt
    OpImm(BinOp, Reg, Reg, i64),  // rd = rs <op> imm

    Lw(Reg, Reg, i64),            // rd = mem[base + offset]
    Sw(Reg, Reg, i64),            // mem[base + offset] = rs
    Li(Reg, i64),                 // rd = imm
    La(Reg, String),              // rd = &symbol

    J(Label),
    Beq(Reg, Reg, Label),

    Move(Reg, Reg),               // rd = rs
    Syscall,
    Nop,

    // Assembly pseudo-instructions
    Label(Label),
    Directive(String),            // .data, .text, __str0: .asciiz "..."
    Comment(String),
}

impl AsmInst {
    /// Render as a full output line: instructions are tab-indented,
    /// labels and directives start at column zero.
    pub fn line(&self) -> String {
        match self {
            AsmInst::Label(_) | AsmInst::Directive(_) => format!("{self}\n"),
            _ => format!("\t{self}\n"),
        }
    }
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Op(op, rd, rs, rt) => write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs, rt),
            AsmInst::OpImm(op, rd, rs, imm) => {
                write!(f, "{} {}, {}, {}", op.immediate_mnemonic(), rd, rs, imm)
            }

            AsmInst::Lw(rd, base, offset) => write!(f, "lw {}, {}({})", rd, offset, base),
            AsmInst::Sw(rs, base, offset) => write!(f, "sw {}, {}({})", rs, offset, base),
            AsmInst::Li(rd, imm) => write!(f, "li {}, {}", rd, imm),
            AsmInst::La(rd, symbol) => write!(f, "la {}, {}", rd, symbol),

            AsmInst::J(label) => write!(f, "j {}", label),
            AsmInst::Beq(rs, rt, label) => write!(f, "beq {}, {}, {}", rs, rt, label),

            AsmInst::Move(rd, rs) => write!(f, "move {}, {}", rd, rs),
            AsmInst::Syscall => write!(f, "syscall"),
            AsmInst::Nop => write!(f, "nop"),

            AsmInst::Label(label) => write!(f, "{}:", label),
            AsmInst::Directive(text) => write!(f, "{}", text),
            AsmInst::Comment(text) => write!(f, "# {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmc_common::LabelGenerator;

    #[test]
    fn test_register_display() {
        assert_eq!(format!("{}", Reg::Zero), "$zero");
        assert_eq!(format!("{}", Reg::T0), "$t0");
        assert_eq!(format!("{}", Reg::T9), "$t9");
        assert_eq!(format!("{}", Reg::Gp), "$gp");
    }

    #[test]
    fn test_register_indices() {
        for (i, reg) in Reg::ALL.iter().enumerate() {
            assert_eq!(reg.index(), i);
            assert_eq!(Reg::from_index(i), Some(*reg));
        }
        assert_eq!(Reg::T0.index(), Reg::FIRST_ALLOCATABLE);
        assert_eq!(Reg::T9.index(), Reg::LAST_ALLOCATABLE);
        assert_eq!(Reg::ALLOCATABLE_COUNT, 18);
        assert_eq!(Reg::from_index(32), None);
    }

    #[test]
    fn test_allocatable_block() {
        let allocatable: Vec<Reg> = Reg::ALL.iter().copied().filter(|r| r.is_allocatable()).collect();
        assert_eq!(allocatable.len(), 18);
        assert!(!Reg::V0.is_allocatable());
        assert!(!Reg::A3.is_allocatable());
        assert!(!Reg::K0.is_allocatable());
        assert!(Reg::S7.is_allocatable());
        assert!(Reg::T8.is_allocatable());
    }

    #[test]
    fn test_register_from_name() {
        assert_eq!(Reg::from_name("$sp"), Some(Reg::Sp));
        assert_eq!(Reg::from_name("s3"), Some(Reg::S3));
        assert_eq!(Reg::from_name("$r3"), None);
    }

    #[test]
    fn test_instruction_display() {
        let mut labels = LabelGenerator::new();
        let l0 = labels.next();

        assert_eq!(AsmInst::Li(Reg::T0, 42).to_string(), "li $t0, 42");
        assert_eq!(AsmInst::Op(BinOp::Add, Reg::T2, Reg::T0, Reg::T1).to_string(), "add $t2, $t0, $t1");
        assert_eq!(AsmInst::OpImm(BinOp::Sub, Reg::T2, Reg::T0, 3).to_string(), "subi $t2, $t0, 3");
        assert_eq!(AsmInst::OpImm(BinOp::Seq, Reg::T2, Reg::T0, 0).to_string(), "seq $t2, $t0, 0");
        assert_eq!(AsmInst::Lw(Reg::T1, Reg::Gp, 8).to_string(), "lw $t1, 8($gp)");
        assert_eq!(AsmInst::Sw(Reg::T1, Reg::Fp, -4).to_string(), "sw $t1, -4($fp)");
        assert_eq!(AsmInst::Beq(Reg::T0, Reg::Zero, l0).to_string(), "beq $t0, $zero, .L0");
        assert_eq!(AsmInst::Label(l0).to_string(), ".L0:");
        assert_eq!(AsmInst::Comment("print new line".to_string()).to_string(), "# print new line");
    }

    #[test]
    fn test_instruction_lines() {
        let mut labels = LabelGenerator::new();
        assert_eq!(AsmInst::Syscall.line(), "\tsyscall\n");
        assert_eq!(AsmInst::Label(labels.next()).line(), ".L0:\n");
        assert_eq!(AsmInst::Directive(".text".to_string()).line(), ".text\n");
    }

    #[test]
    fn test_binop_mnemonics_roundtrip() {
        for name in ["add", "sub", "mul", "div", "xor", "or", "and", "slt", "sle", "sgt", "sge", "seq", "sne"] {
            let op = BinOp::from_mnemonic(name).unwrap();
            assert_eq!(op.mnemonic(), name);
        }
        assert_eq!(BinOp::from_mnemonic("rem"), None);
    }
}
