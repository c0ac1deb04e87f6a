//! Code generation: lower the typed AST into stack-machine assembly.
//!
//! Every expression leaves one value on the operand stack. Variables live in
//! data memory at `[frame base + offset]`; the target has no frame register,
//! so the base is kept in memory cell `[0]` and loaded into `cx` before each
//! access. A call moves `[0]` past the caller's frame and moves it back
//! afterwards. Return addresses travel on the operand stack.

mod expr;
mod stmt;

use tracing::debug;

use crate::ast::{Function, Program};
use crate::error::{Diagnostic, RefContext};
use crate::frame::Frame;
use crate::ident::{IdentId, IdentTable};

/// Labels owned by the runtime helpers. User functions may not take them.
pub const RESERVED_LABELS: &[&str] = &[
  "equal", "below", "above", "eq1", "eq0", "eq_end", "b1", "b0", "b_end", "a1", "a0", "a_end",
];

/// Relational helpers: label, jump when true, jump when false, and the three local labels.
const HELPERS: [[&str; 6]; 3] = [
  ["equal", "je", "jne", "eq1", "eq0", "eq_end"],
  ["below", "jb", "jae", "b1", "b0", "b_end"],
  ["above", "ja", "jbe", "a1", "a0", "a_end"],
];

/// Result of one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
  pub assembly: String,
  pub diagnostics: Vec<Diagnostic>,
}

/// Whether a unit of code was emitted or dropped after a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Emitted,
  Diagnosed,
}

impl Outcome {
  fn and(self, other: Outcome) -> Outcome {
    match (self, other) {
      (Outcome::Emitted, Outcome::Emitted) => Outcome::Emitted,
      _ => Outcome::Diagnosed,
    }
  }
}

/// Emit assembly for a whole program.
pub fn generate(program: &Program, idents: &IdentTable) -> Compilation {
  let mut cg = Codegen::new(idents);
  cg.emit_program(program);
  Compilation {
    assembly: cg.asm,
    diagnostics: cg.diagnostics,
  }
}

/// State of one run: output buffer, label counters and the function being emitted.
struct Codegen<'a> {
  idents: &'a IdentTable,
  asm: String,
  diagnostics: Vec<Diagnostic>,
  if_count: usize,
  while_count: usize,
  function: IdentId,
  frame: Frame,
}

impl<'a> Codegen<'a> {
  fn new(idents: &'a IdentTable) -> Self {
    Self {
      idents,
      asm: String::new(),
      diagnostics: Vec::new(),
      if_count: 0,
      while_count: 0,
      function: IdentId(0),
      frame: Frame::default(),
    }
  }

  fn emit_program(&mut self, program: &Program) {
    self.asm.push_str("call main\nend\n\n");
    self.emit_helpers();
    for func in &program.functions {
      self.emit_function(func);
    }
  }

  /// `call <helper>` expects the left operand on top, the right one beneath
  /// it and the return address above both. The helper replaces the operands
  /// with 0 or 1 and puts the return address back on top.
  fn emit_helpers(&mut self) {
    for [label, jump_true, jump_false, on_true, on_false, end] in HELPERS {
      self.asm.push_str(&format!(
        "{label}:\npop dx\n{jump_true} {on_true}\n{jump_false} {on_false}\n\
         {on_true}:\npush 1\njmp {end}\n{on_false}:\npush 0\n\
         {end}:\npop ax\npop bx\npop bx\npush ax\npush dx\nret\n\n"
      ));
    }
  }

  fn emit_function(&mut self, func: &Function) {
    self.function = func.name;
    self.frame = Frame::build(func);
    let idents = self.idents;
    let name = idents.resolve(func.name);
    debug!(function = name, frame_size = self.frame.size(), "emitting function");

    self.asm.push_str(&format!("{name}:\n"));
    self.emit_prologue(func);
    let outcome = self.emit_block(&func.body);
    self.asm.push_str("ret\n\n");
    if outcome == Outcome::Diagnosed {
      debug!(function = name, "function emitted with dropped statements");
    }
  }

  /// Move arguments from the operand stack into parameter slots. The caller
  /// pushed the first argument first, so the last parameter is popped first.
  fn emit_prologue(&mut self, func: &Function) {
    if func.params.is_empty() {
      return;
    }

    self.asm.push_str("pop dx\npush [0]\npop cx\n");
    for &param in func.params.iter().rev() {
      if let Some(offset) = self.frame.find(param) {
        self.asm.push_str(&format!("pop [cx+{offset}]\n"));
      }
    }
    self.asm.push_str("push dx\n");
  }

  /// Frame offset of `id`, recording a diagnostic when it is not declared.
  fn lookup(&mut self, id: IdentId, context: RefContext) -> Option<usize> {
    let offset = self.frame.find(id);
    if offset.is_none() {
      let diagnostic = Diagnostic::UndefinedVariable {
        name: self.idents.resolve(id).to_string(),
        function: self.idents.resolve(self.function).to_string(),
        context,
      };
      debug!(%diagnostic, "dropping statement");
      self.diagnostics.push(diagnostic);
    }
    offset
  }

  fn emit_load(&mut self, offset: usize) {
    self.asm.push_str(&format!("push [0]\npop cx\npush [cx+{offset}]\n"));
  }

  fn emit_store(&mut self, offset: usize) {
    self.asm.push_str(&format!("push [0]\npop cx\npop [cx+{offset}]\n"));
  }

  fn next_if_label(&mut self) -> usize {
    let n = self.if_count;
    self.if_count += 1;
    debug!(label = n, "allocated if label");
    n
  }

  fn next_while_label(&mut self) -> usize {
    let n = self.while_count;
    self.while_count += 1;
    debug!(label = n, "allocated while label");
    n
  }
}
