//! Request scripts
//!
//! A script stands in for the parser's semantic actions: an ordered list of
//! code-generation requests, replayed against a [`CodegenContext`]. Registers
//! handed out by `alloc` and labels created by `label` are bound to names
//! that later requests refer to. Fixed registers are written with their
//! sigil, e.g. `"$gp"`.
//!
//! ```json
//! {
//!   "strings": ["result: "],
//!   "requests": [
//!     { "op": "alloc", "name": "a" },
//!     { "op": "li", "dst": "a", "value": 1 },
//!     { "op": "write_reg", "reg": "a" },
//!     { "op": "free", "name": "a" }
//!   ]
//! }
//! ```

use cmc_codegen::{BinOp, CodegenContext, CodegenError, Construct, Label, Reg, StringLiterals};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("code generation failed at request {index} ({op}): {source}")]
    Codegen {
        index: usize,
        op: &'static str,
        #[source]
        source: CodegenError,
    },

    #[error("request {index}: unknown register or slot '{name}'")]
    UnknownRegister { index: usize, name: String },

    #[error("request {index}: unknown label '{name}'")]
    UnknownLabel { index: usize, name: String },

    #[error("request {index}: slot '{name}' is already bound")]
    SlotInUse { index: usize, name: String },

    #[error("request {index}: register {name} is held by slot '{slot}'; free the slot instead")]
    RegisterHeld { index: usize, name: String, slot: String },

    #[error("unknown demo '{0}', expected one of: {names}", names = crate::demos::NAMES.join(", "))]
    UnknownDemo(String),

    #[error("request {index}: unknown operator '{name}'")]
    UnknownOperator { index: usize, name: String },

    #[error("end of program: {0}")]
    Finish(CodegenError),

    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ScriptError {
    /// Process exit status, reflecting the OS error for IO failures
    pub fn exit_code(&self) -> i32 {
        match self {
            ScriptError::Codegen { source, .. } => source.exit_code(),
            ScriptError::Finish(source) => source.exit_code(),
            ScriptError::Io(err) => err.raw_os_error().unwrap_or(1),
            ScriptError::UnknownDemo(_) => 2,
            _ => 1,
        }
    }
}

/// A complete request script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// String literals, stored as `__str0`, `__str1`, ... in order
    #[serde(default)]
    pub strings: Vec<String>,
    pub requests: Vec<Request>,
}

impl Script {
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Alloc { name: String },
    Free { name: String },
    Label { name: String },
    Place { label: String },

    Binop { operator: String, dst: String, lhs: String, rhs: String },
    BinopImm { operator: String, dst: String, src: String, value: i64 },
    Lw { dst: String, base: String, offset: i64 },
    Sw { src: String, base: String, offset: i64 },
    Li { dst: String, value: i64 },
    La { dst: String, symbol: String },
    Jump { label: String },
    Beq { lhs: String, rhs: String, label: String },
    Move { dst: String, src: String },

    WriteNewline,
    WriteInt { value: i64 },
    WriteReg { reg: String },
    WriteString { reg: String },
    ReadInt { dst: String },

    // Raw buffer stack access
    PushIf { else_label: String, end_label: String },
    PushElse { else_label: String, end_label: String },
    PushLoop { entry: String, exit: String },
    Merge { levels: usize },
    Close,

    // Structured control constructs
    BeginIf { cond: String },
    BeginElse,
    EndIf,
    BeginWhile,
    LoopTest { cond: String },
    EndWhile,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Alloc { .. } => "alloc",
            Request::Free { .. } => "free",
            Request::Label { .. } => "label",
            Request::Place { .. } => "place",
            Request::Binop { .. } => "binop",
            Request::BinopImm { .. } => "binop_imm",
            Request::Lw { .. } => "lw",
            Request::Sw { .. } => "sw",
            Request::Li { .. } => "li",
            Request::La { .. } => "la",
            Request::Jump { .. } => "jump",
            Request::Beq { .. } => "beq",
            Request::Move { .. } => "move",
            Request::WriteNewline => "write_newline",
            Request::WriteInt { .. } => "write_int",
            Request::WriteReg { .. } => "write_reg",
            Request::WriteString { .. } => "write_string",
            Request::ReadInt { .. } => "read_int",
            Request::PushIf { .. } => "push_if",
            Request::PushElse { .. } => "push_else",
            Request::PushLoop { .. } => "push_loop",
            Request::Merge { .. } => "merge",
            Request::Close => "close",
            Request::BeginIf { .. } => "begin_if",
            Request::BeginElse => "begin_else",
            Request::EndIf => "end_if",
            Request::BeginWhile => "begin_while",
            Request::LoopTest { .. } => "loop_test",
            Request::EndWhile => "end_while",
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub requests: usize,
    pub labels_issued: u64,
    pub max_depth: usize,
    pub max_live_registers: usize,
    pub string_literals: usize,
}

/// Replays a script against a code generation context
pub struct Runner<W: Write> {
    ctx: CodegenContext<W>,
    regs: HashMap<String, Reg>,
    labels: HashMap<String, Label>,
    stats: RunStats,
}

impl<W: Write> Runner<W> {
    pub fn new(ctx: CodegenContext<W>) -> Self {
        Self {
            ctx,
            regs: HashMap::new(),
            labels: HashMap::new(),
            stats: RunStats::default(),
        }
    }

    /// Run the whole program: prolog, every request, epilog and data section
    pub fn run(mut self, script: &Script) -> Result<(W, RunStats), ScriptError> {
        self.ctx
            .prolog()
            .map_err(|source| ScriptError::Codegen { index: 0, op: "prolog", source })?;

        for (index, request) in script.requests.iter().enumerate() {
            trace!("Request {index}: {request:?}");
            self.apply(index, request)?;
            self.stats.requests += 1;
            self.stats.max_depth = self.stats.max_depth.max(self.ctx.stack().depth());
            self.stats.max_live_registers =
                self.stats.max_live_registers.max(self.ctx.pool().outstanding());
        }

        let strings: StringLiterals = script.strings.iter().cloned().collect();
        self.ctx.finish(&strings).map_err(ScriptError::Finish)?;

        self.stats.labels_issued = self.ctx.labels().issued();
        self.stats.string_literals = script.strings.len();
        debug!("Script finished: {:?}", self.stats);

        let out = self.ctx.into_output().map_err(ScriptError::Finish)?;
        Ok((out, self.stats))
    }

    fn reg(&self, index: usize, name: &str) -> Result<Reg, ScriptError> {
        let found = if name.starts_with('$') {
            Reg::from_name(name)
        } else {
            self.regs.get(name).copied()
        };
        found.ok_or_else(|| ScriptError::UnknownRegister {
            index,
            name: name.to_string(),
        })
    }

    fn label(&self, index: usize, name: &str) -> Result<Label, ScriptError> {
        self.labels
            .get(name)
            .copied()
            .ok_or_else(|| ScriptError::UnknownLabel {
                index,
                name: name.to_string(),
            })
    }

    fn op(&self, index: usize, name: &str) -> Result<BinOp, ScriptError> {
        BinOp::from_mnemonic(name).ok_or_else(|| ScriptError::UnknownOperator {
            index,
            name: name.to_string(),
        })
    }

    fn apply(&mut self, index: usize, request: &Request) -> Result<(), ScriptError> {
        let wrap = |source| ScriptError::Codegen {
            index,
            op: request.name(),
            source,
        };

        match request {
            Request::Alloc { name } => {
                if self.regs.contains_key(name) {
                    return Err(ScriptError::SlotInUse { index, name: name.clone() });
                }
                let reg = self.ctx.alloc_reg().map_err(wrap)?;
                self.regs.insert(name.clone(), reg);
            }
            Request::Free { name } => {
                let reg = self.reg(index, name)?;
                if name.starts_with('$') {
                    if let Some((slot, _)) = self.regs.iter().find(|(_, held)| **held == reg) {
                        return Err(ScriptError::RegisterHeld {
                            index,
                            name: name.clone(),
                            slot: slot.clone(),
                        });
                    }
                }
                self.ctx.free_reg(reg).map_err(wrap)?;
                self.regs.remove(name);
            }
            Request::Label { name } => {
                let label = self.ctx.new_label();
                self.labels.insert(name.clone(), label);
            }
            Request::Place { label } => {
                let label = self.label(index, label)?;
                self.ctx.place_label(label).map_err(wrap)?;
            }

            Request::Binop { operator, dst, lhs, rhs } => {
                let op = self.op(index, operator)?;
                let (dst, lhs, rhs) = (self.reg(index, dst)?, self.reg(index, lhs)?, self.reg(index, rhs)?);
                self.ctx.issue_op(op, dst, lhs, rhs).map_err(wrap)?;
            }
            Request::BinopImm { operator, dst, src, value } => {
                let op = self.op(index, operator)?;
                let (dst, src) = (self.reg(index, dst)?, self.reg(index, src)?);
                self.ctx.issue_op_imm(op, dst, src, *value).map_err(wrap)?;
            }
            Request::Lw { dst, base, offset } => {
                let (dst, base) = (self.reg(index, dst)?, self.reg(index, base)?);
                self.ctx.issue_lw(dst, base, *offset).map_err(wrap)?;
            }
            Request::Sw { src, base, offset } => {
                let (src, base) = (self.reg(index, src)?, self.reg(index, base)?);
                self.ctx.issue_sw(src, base, *offset).map_err(wrap)?;
            }
            Request::Li { dst, value } => {
                let dst = self.reg(index, dst)?;
                self.ctx.issue_li(dst, *value).map_err(wrap)?;
            }
            Request::La { dst, symbol } => {
                let dst = self.reg(index, dst)?;
                self.ctx.issue_la(dst, symbol).map_err(wrap)?;
            }
            Request::Jump { label } => {
                let label = self.label(index, label)?;
                self.ctx.issue_jump(label).map_err(wrap)?;
            }
            Request::Beq { lhs, rhs, label } => {
                let (lhs, rhs) = (self.reg(index, lhs)?, self.reg(index, rhs)?);
                let label = self.label(index, label)?;
                self.ctx.issue_beq(lhs, rhs, label).map_err(wrap)?;
            }
            Request::Move { dst, src } => {
                let (dst, src) = (self.reg(index, dst)?, self.reg(index, src)?);
                self.ctx.issue_move(dst, src).map_err(wrap)?;
            }

            Request::WriteNewline => self.ctx.write_new_line().map_err(wrap)?,
            Request::WriteInt { value } => self.ctx.write_const_int(*value).map_err(wrap)?,
            Request::WriteReg { reg } => {
                let reg = self.reg(index, reg)?;
                self.ctx.write_reg_value(reg).map_err(wrap)?;
            }
            Request::WriteString { reg } => {
                let reg = self.reg(index, reg)?;
                self.ctx.write_const_string(reg).map_err(wrap)?;
            }
            Request::ReadInt { dst } => {
                let dst = self.reg(index, dst)?;
                self.ctx.read_int(dst).map_err(wrap)?;
            }

            Request::PushIf { else_label, end_label } | Request::PushElse { else_label, end_label } => {
                let construct = Construct::Conditional {
                    else_label: self.label(index, else_label)?,
                    end_label: self.label(index, end_label)?,
                    in_else: matches!(request, Request::PushElse { .. }),
                };
                self.ctx.push(construct).map_err(wrap)?;
            }
            Request::PushLoop { entry, exit } => {
                let construct = Construct::Loop {
                    entry: self.label(index, entry)?,
                    exit: self.label(index, exit)?,
                };
                self.ctx.push(construct).map_err(wrap)?;
            }
            Request::Merge { levels } => self.ctx.merge(*levels).map_err(wrap)?,
            Request::Close => {
                self.ctx.close_level().map_err(wrap)?;
            }

            Request::BeginIf { cond } => {
                let cond = self.reg(index, cond)?;
                self.ctx.begin_if(cond).map_err(wrap)?;
            }
            Request::BeginElse => self.ctx.begin_else().map_err(wrap)?,
            Request::EndIf => self.ctx.end_if().map_err(wrap)?,
            Request::BeginWhile => self.ctx.begin_while().map_err(wrap)?,
            Request::LoopTest { cond } => {
                let cond = self.reg(index, cond)?;
                self.ctx.loop_test(cond).map_err(wrap)?;
            }
            Request::EndWhile => self.ctx.end_while().map_err(wrap)?,
        }

        Ok(())
    }
}
