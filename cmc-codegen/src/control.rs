//! Control constructs built on the buffer stack
//!
//! `if`/`else` and `while` are generated into buffering levels so that the
//! text of a construct is only released once its final shape is known. The
//! level's [`Construct`] carries the jump targets, so asking for a loop
//! exit on a conditional level is caught here rather than by convention.
//!
//! Layout produced for `if (c) A else B`:
//!
//! ```text
//!     beq c, $zero, else
//!     A
//!     j end
//! else:
//!     B
//! end:
//! ```
//!
//! and for `while (c) A`:
//!
//! ```text
//! entry:
//!     beq c, $zero, exit
//!     A
//!     j entry
//! exit:
//! ```

use crate::asm::Reg;
use crate::buffer::Construct;
use crate::context::CodegenContext;
use cmc_common::{CodegenError, Label, Result};
use std::io::Write;

impl<W: Write> CodegenContext<W> {
    fn top_construct(&self) -> Result<Construct> {
        Ok(*self.stack.top()?.construct())
    }

    /// Branch over the then-part when `cond` is zero and open its level
    pub fn begin_if(&mut self, cond: Reg) -> Result<()> {
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.issue_beq(cond, Reg::Zero, else_label)?;
        self.push(Construct::Conditional {
            else_label,
            end_label,
            in_else: false,
        })
    }

    /// Finish the then-part and open a level for the else-part
    pub fn begin_else(&mut self) -> Result<()> {
        let (else_label, end_label) = match self.top_construct()? {
            Construct::Conditional {
                else_label,
                end_label,
                in_else: false,
            } => (else_label, end_label),
            other => {
                return Err(CodegenError::ConstructMismatch {
                    expected: "conditional",
                    found: other.kind(),
                })
            }
        };

        self.issue_jump(end_label)?;
        self.push(Construct::Conditional {
            else_label,
            end_label,
            in_else: true,
        })?;
        self.place_label(else_label)
    }

    /// Close the innermost conditional, with or without an else-part
    pub fn end_if(&mut self) -> Result<()> {
        match self.top_construct()? {
            Construct::Conditional { in_else: true, end_label, .. } => {
                self.merge(2)?;
                self.close_level()?;
                self.place_label(end_label)
            }
            Construct::Conditional { in_else: false, else_label, .. } => {
                self.close_level()?;
                self.place_label(else_label)
            }
            other => Err(CodegenError::ConstructMismatch {
                expected: "conditional",
                found: other.kind(),
            }),
        }
    }

    /// Open a loop level headed by its entry label
    pub fn begin_while(&mut self) -> Result<()> {
        let entry = self.new_label();
        let exit = self.new_label();

        self.push(Construct::Loop { entry, exit })?;
        self.place_label(entry)
    }

    fn loop_labels(&self) -> Result<(Label, Label)> {
        match self.top_construct()? {
            Construct::Loop { entry, exit } => Ok((entry, exit)),
            other => Err(CodegenError::ConstructMismatch {
                expected: "loop",
                found: other.kind(),
            }),
        }
    }

    /// Leave the loop when `cond` is zero
    pub fn loop_test(&mut self, cond: Reg) -> Result<()> {
        let (_, exit) = self.loop_labels()?;
        self.issue_beq(cond, Reg::Zero, exit)
    }

    /// Jump back to the condition, place the exit and release the loop text
    pub fn end_while(&mut self) -> Result<()> {
        let (entry, exit) = self.loop_labels()?;
        self.issue_jump(entry)?;
        self.place_label(exit)?;
        self.close_level()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CodegenOptions;
    use pretty_assertions::assert_eq;

    fn text(ctx: &CodegenContext<Vec<u8>>) -> String {
        String::from_utf8(ctx.output().clone()).unwrap()
    }

    #[test]
    fn test_if_without_else() {
        let mut ctx = CodegenContext::new(Vec::new());
        ctx.begin_if(Reg::T0).unwrap();
        ctx.write_const_int(1).unwrap();
        assert_eq!(text(&ctx), "\tbeq $t0, $zero, .L0\n");

        ctx.end_if().unwrap();
        assert_eq!(
            text(&ctx),
            "\tbeq $t0, $zero, .L0\n\tli $a0, 1\n\tli $v0, 1\n\tsyscall\n.L0:\n"
        );
        assert!(ctx.stack().is_empty());
    }

    #[test]
    fn test_if_else() {
        let mut ctx = CodegenContext::new(Vec::new());
        ctx.begin_if(Reg::T0).unwrap();
        ctx.issue_li(Reg::T1, 1).unwrap();
        ctx.begin_else().unwrap();
        ctx.issue_li(Reg::T1, 2).unwrap();
        assert_eq!(ctx.stack().depth(), 2);

        ctx.end_if().unwrap();
        let expected = concat!(
            "\tbeq $t0, $zero, .L0\n",
            "\tli $t1, 1\n",
            "\tj .L1\n",
            ".L0:\n",
            "\tli $t1, 2\n",
            ".L1:\n",
        );
        assert_eq!(text(&ctx), expected);
    }

    #[test]
    fn test_while() {
        let mut ctx = CodegenContext::new(Vec::new());
        ctx.begin_while().unwrap();
        ctx.issue_lw(Reg::T0, Reg::Gp, 0).unwrap();
        ctx.loop_test(Reg::T0).unwrap();
        ctx.write_reg_value(Reg::T0).unwrap();
        assert_eq!(text(&ctx), "");

        ctx.end_while().unwrap();
        let expected = concat!(
            ".L0:\n",
            "\tlw $t0, 0($gp)\n",
            "\tbeq $t0, $zero, .L1\n",
            "\tmove $a0, $t0\n\tli $v0, 1\n\tsyscall\n",
            "\tj .L0\n",
            ".L1:\n",
        );
        assert_eq!(text(&ctx), expected);
    }

    #[test]
    fn test_end_if_into_full_loop_keeps_merged_text() {
        let options = CodegenOptions { buffer_capacity: 40, ..CodegenOptions::default() };
        let mut ctx = CodegenContext::with_options(Vec::new(), options);
        ctx.begin_while().unwrap();
        ctx.begin_if(Reg::T0).unwrap();
        ctx.begin_else().unwrap();
        ctx.issue_li(Reg::T1, 2).unwrap();

        assert_eq!(
            ctx.end_if(),
            Err(CodegenError::CapacityExceeded { needed: 49, capacity: 40 })
        );
        assert_eq!(ctx.stack().depth(), 2);
        assert_eq!(ctx.stack().top().unwrap().text(), "\tj .L3\n.L2:\n\tli $t1, 2\n");
        assert_eq!(ctx.stack().enclosing().unwrap().text(), ".L0:\n\tbeq $t0, $zero, .L2\n");
    }

    #[test]
    fn test_while_nested_in_if() {
        let mut ctx = CodegenContext::new(Vec::new());
        ctx.begin_if(Reg::T0).unwrap();
        ctx.begin_while().unwrap();
        ctx.loop_test(Reg::T1).unwrap();
        ctx.end_while().unwrap();
        assert_eq!(text(&ctx), "\tbeq $t0, $zero, .L0\n");

        ctx.end_if().unwrap();
        let expected = concat!(
            "\tbeq $t0, $zero, .L0\n",
            ".L2:\n",
            "\tbeq $t1, $zero, .L3\n",
            "\tj .L2\n",
            ".L3:\n",
            ".L0:\n",
        );
        assert_eq!(text(&ctx), expected);
    }

    #[test]
    fn test_role_confusion_is_rejected() {
        let mut ctx = CodegenContext::new(Vec::new());
        ctx.begin_while().unwrap();
        assert_eq!(
            ctx.begin_else(),
            Err(CodegenError::ConstructMismatch { expected: "conditional", found: "loop" })
        );
        assert_eq!(
            ctx.end_if(),
            Err(CodegenError::ConstructMismatch { expected: "conditional", found: "loop" })
        );

        let mut ctx = CodegenContext::new(Vec::new());
        ctx.begin_if(Reg::T0).unwrap();
        assert_eq!(
            ctx.loop_test(Reg::T0),
            Err(CodegenError::ConstructMismatch { expected: "loop", found: "conditional" })
        );
        ctx.begin_else().unwrap();
        assert_eq!(
            ctx.begin_else(),
            Err(CodegenError::ConstructMismatch { expected: "conditional", found: "else" })
        );
    }

    #[test]
    fn test_end_without_open_construct() {
        let mut ctx = CodegenContext::new(Vec::new());
        assert_eq!(ctx.end_if(), Err(CodegenError::EmptyStack));
        assert_eq!(ctx.end_while(), Err(CodegenError::EmptyStack));
    }
}
