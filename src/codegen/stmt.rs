//! Statement and control-flow lowering.
//!
//! Conditional jumps compare the two topmost values without popping them.
//! A condition is tested as `<cond> push 0 jae <skip>`, and every path out
//! of the test starts with `pop ax pop ax` so both paths leave the stack as
//! they found it.

use tracing::debug;

use crate::ast::{Block, Expr, Stmt};
use crate::error::RefContext;
use crate::ident::IdentId;

use super::{Codegen, Outcome};

const DROP_TEST: &str = "pop ax\npop ax\n";

impl Codegen<'_> {
  /// `Diagnosed` when any statement in the block was dropped.
  pub(super) fn emit_block(&mut self, block: &Block) -> Outcome {
    block
      .stmts
      .iter()
      .fold(Outcome::Emitted, |outcome, stmt| outcome.and(self.emit_stmt(stmt)))
  }

  fn emit_stmt(&mut self, stmt: &Stmt) -> Outcome {
    match stmt {
      Stmt::If {
        cond,
        then,
        otherwise,
      } => self.emit_if(cond, then, otherwise.as_ref()),
      Stmt::While { cond, body } => self.emit_while(cond, body),
      Stmt::VarDecl { target, init } => match init {
        Some(init) => self.emit_assign(*target, init),
        None => Outcome::Emitted,
      },
      Stmt::Assign { target, value } => self.emit_assign(*target, value),
      Stmt::Input { target } => {
        let Some(offset) = self.lookup(*target, RefContext::InputCall) else {
          return Outcome::Diagnosed;
        };
        self.asm.push_str("in\n");
        self.emit_store(offset);
        Outcome::Emitted
      }
      Stmt::Output { target } => {
        let Some(offset) = self.lookup(*target, RefContext::OutputCall) else {
          return Outcome::Diagnosed;
        };
        self.emit_load(offset);
        self.asm.push_str(&format!("out\npop [cx+{offset}]\n"));
        Outcome::Emitted
      }
      Stmt::Return { value } => {
        let Some(offset) = self.lookup(*value, RefContext::ReturnCall) else {
          return Outcome::Diagnosed;
        };
        self.asm.push_str("pop dx\n");
        self.emit_load(offset);
        self.asm.push_str("push dx\nret\n");
        Outcome::Emitted
      }
      Stmt::Unsupported { kind, .. } => {
        debug!(%kind, "skipping statement without a generator");
        Outcome::Emitted
      }
    }
  }

  fn emit_if(&mut self, cond: &Expr, then: &Block, otherwise: Option<&Block>) -> Outcome {
    let outcome = self.emit_expr(cond);
    let n = self.next_if_label();

    self.asm.push_str(&format!("push 0\njae if{n}false\nif{n}true:\n{DROP_TEST}"));
    let mut outcome = outcome.and(self.emit_block(then));
    self.asm.push_str(&format!("jmp if{n}end\nif{n}false:\n{DROP_TEST}"));
    if let Some(otherwise) = otherwise {
      outcome = outcome.and(self.emit_block(otherwise));
    }
    self.asm.push_str(&format!("if{n}end:\n"));
    outcome
  }

  fn emit_while(&mut self, cond: &Expr, body: &Block) -> Outcome {
    let n = self.next_while_label();

    self.asm.push_str(&format!("while{n}condition:\n"));
    let outcome = self.emit_expr(cond);
    self.asm.push_str(&format!("push 0\njae while{n}end\n{DROP_TEST}"));
    let outcome = outcome.and(self.emit_block(body));
    self.asm.push_str(&format!("jmp while{n}condition\nwhile{n}end:\n{DROP_TEST}"));
    outcome
  }

  /// Evaluate `value` into the slot of `target`. Nothing is emitted when the
  /// target is undeclared.
  fn emit_assign(&mut self, target: IdentId, value: &Expr) -> Outcome {
    let Some(offset) = self.lookup(target, RefContext::Assignment) else {
      return Outcome::Diagnosed;
    };
    let outcome = self.emit_expr(value);
    self.emit_store(offset);
    outcome
  }
}
