//! Expression lowering.
//!
//! Binary instructions pop `a` then `b` and push `a op b`, so the operand
//! that ends on top is the left one. Sub, div and the relational helpers
//! therefore emit the right operand first.

use crate::ast::{BinaryOp, Expr};
use crate::error::RefContext;
use crate::ident::IdentId;

use super::{Codegen, Outcome};

impl Codegen<'_> {
  /// Emit code that leaves the value of `expr` on the operand stack.
  pub(super) fn emit_expr(&mut self, expr: &Expr) -> Outcome {
    match expr {
      Expr::Num { value } => {
        self.asm.push_str(&format!("push {value}\n"));
        Outcome::Emitted
      }
      Expr::Var { id } => match self.lookup(*id, RefContext::Expression) {
        Some(offset) => {
          self.emit_load(offset);
          Outcome::Emitted
        }
        None => Outcome::Diagnosed,
      },
      Expr::Binary { op, lhs, rhs } => {
        let (first, second) = match op {
          BinaryOp::Add | BinaryOp::Mul => (lhs, rhs),
          _ => (rhs, lhs),
        };
        let outcome = self.emit_expr(first).and(self.emit_expr(second));
        let insn = match op {
          BinaryOp::Add => "add",
          BinaryOp::Mul => "mul",
          BinaryOp::Sub => "sub",
          BinaryOp::Div => "div",
          BinaryOp::Equal => "call equal",
          BinaryOp::Below => "call below",
          BinaryOp::Above => "call above",
        };
        self.asm.push_str(insn);
        self.asm.push('\n');
        outcome
      }
      Expr::Sqrt { operand, .. } => {
        let outcome = self.emit_expr(operand);
        self.asm.push_str("sqrt\n");
        outcome
      }
      Expr::Call { callee, args } => self.emit_call(*callee, args),
    }
  }

  /// Push arguments nearest first, step the frame base past the caller's
  /// frame for the duration of the call, then step it back.
  fn emit_call(&mut self, callee: IdentId, args: &[IdentId]) -> Outcome {
    let mut outcome = Outcome::Emitted;
    for &arg in args {
      match self.lookup(arg, RefContext::CallArgument) {
        Some(offset) => self.emit_load(offset),
        None => outcome = Outcome::Diagnosed,
      }
    }

    let depth = self.frame.size();
    let idents = self.idents;
    let name = idents.resolve(callee);
    self.asm.push_str(&format!(
      "push [0]\npush {depth}\nadd\npop [0]\ncall {name}\npush {depth}\npush [0]\nsub\npop [0]\n"
    ));
    outcome
  }
}
