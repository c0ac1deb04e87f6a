//! Per-function variable frames.
//!
//! Address 0 of data memory holds the frame base, so slot offsets start at 1.
//! Slots are assigned in the order the serialized tree is walked: left child
//! before right child. For a function body that means parameters first, then
//! the statement chain from its tail back to its head, else-branches before
//! then-branches. Call arguments are walked as declaration sites too, and
//! so are the sites lowering kept under `SQR` and unhandled statements.
//!
//! `count_vars` counts every site, `Frame::slots` keeps each id once. The
//! count is what a call bumps the frame base by, so a repeated declaration
//! still reserves room.

use std::collections::HashMap;

use crate::ast::{Block, Expr, Function, Stmt};
use crate::ident::IdentId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
  slots: Vec<IdentId>,
  offsets: HashMap<IdentId, usize>,
  size: usize,
}

impl Frame {
  /// Resolve the frame of `func`.
  pub fn build(func: &Function) -> Self {
    let mut frame = Self::default();
    walk_function(func, &mut |id| frame.declare(id));
    frame
  }

  fn declare(&mut self, id: IdentId) {
    self.size += 1;
    if !self.offsets.contains_key(&id) {
      self.slots.push(id);
      self.offsets.insert(id, self.slots.len());
    }
  }

  /// Frame offset of `id`, or `None` when the function never declares it.
  pub fn find(&self, id: IdentId) -> Option<usize> {
    self.offsets.get(&id).copied()
  }

  /// Distinct variables, in slot order.
  pub fn slots(&self) -> &[IdentId] {
    &self.slots
  }

  /// Number of declaration sites, the amount a call moves the frame base by.
  pub fn size(&self) -> usize {
    self.size
  }
}

/// Number of declaration sites in `func`.
pub fn count_vars(func: &Function) -> usize {
  let mut count = 0;
  walk_function(func, &mut |_| count += 1);
  count
}

fn walk_function(func: &Function, visit: &mut impl FnMut(IdentId)) {
  for &param in &func.params {
    visit(param);
  }
  walk_block(&func.body, visit);
}

fn walk_block(block: &Block, visit: &mut impl FnMut(IdentId)) {
  // Each `OP` holds its continuation on the left, so later statements come first.
  for stmt in block.stmts.iter().rev() {
    walk_stmt(stmt, visit);
  }
}

fn walk_stmt(stmt: &Stmt, visit: &mut impl FnMut(IdentId)) {
  match stmt {
    Stmt::If {
      cond,
      then,
      otherwise,
    } => {
      walk_expr(cond, visit);
      if let Some(otherwise) = otherwise {
        walk_block(otherwise, visit);
      }
      walk_block(then, visit);
    }
    Stmt::While { cond, body } => {
      walk_expr(cond, visit);
      walk_block(body, visit);
    }
    Stmt::VarDecl { target, .. } => visit(*target),
    Stmt::Assign { value, .. } => walk_expr(value, visit),
    Stmt::Unsupported { sites, .. } => {
      for &site in sites {
        visit(site);
      }
    }
    Stmt::Input { .. } | Stmt::Output { .. } | Stmt::Return { .. } => {}
  }
}

fn walk_expr(expr: &Expr, visit: &mut impl FnMut(IdentId)) {
  match expr {
    Expr::Num { .. } | Expr::Var { .. } => {}
    Expr::Binary { lhs, rhs, .. } => {
      walk_expr(lhs, visit);
      walk_expr(rhs, visit);
    }
    Expr::Sqrt { operand, sites } => {
      for &site in sites {
        visit(site);
      }
      walk_expr(operand, visit);
    }
    Expr::Call { args, .. } => {
      for &arg in args {
        visit(arg);
      }
    }
  }
}
