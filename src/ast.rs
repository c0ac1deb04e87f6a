//! Typed view of the deserialized tree.
//!
//! The serialized format reuses two generic child slots whose meaning
//! depends on the parent kind. Lowering resolves those roles once, here,
//! so the resolver and the generators work with self-describing variants.
//!
//! Child roles in the raw tree:
//! - `PROGRAM_ROOT`: right = first `DECLARATION`
//! - `DECLARATION`: right = `FUNCTION`, left = next `DECLARATION`
//! - `FUNCTION`: left = parameter `VARLIST`, right = name identifier whose right is the `BLOCK`
//! - `BLOCK`: right = first `OP`; `OP`: right = statement, left = next `OP`
//! - `IF`: left = condition, right = `C` (right = then block, left = else block)
//! - `WHILE`: left = condition, right = body
//! - `INITIALIZE`: right = target, left = optional initializer
//! - `ASSIGN`: left = target, right = value
//! - `INPUT` / `OUTPUT` / `RETURN`: right = variable
//! - `CALL`: left = callee, right = argument `VARLIST`
//! - `VARLIST`: right = element, left = rest; no right child ends the list
//!
//! Slots the generators never read must be empty, except under `SQR` and
//! under statements of an unhandled kind. Those subtrees can still declare
//! variables, so their declaration sites are kept on the typed node.

use crate::codegen::RESERVED_LABELS;
use crate::error::{CompileError, CompileResult};
use crate::ident::{IdentId, IdentTable};
use crate::tree::{Node, Tree};
use crate::value::{NodeKind, Value};

type RawNode = Node<Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
  pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
  pub name: IdentId,
  pub params: Vec<IdentId>,
  pub body: Block,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
  pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
  If {
    cond: Expr,
    then: Block,
    otherwise: Option<Block>,
  },
  While {
    cond: Expr,
    body: Block,
  },
  VarDecl {
    target: IdentId,
    init: Option<Expr>,
  },
  Assign {
    target: IdentId,
    value: Expr,
  },
  Input {
    target: IdentId,
  },
  Output {
    target: IdentId,
  },
  Return {
    value: IdentId,
  },
  /// A statement slot holding a kind no generator handles. Emits nothing,
  /// but `sites` still get frame slots.
  Unsupported {
    kind: NodeKind,
    sites: Vec<IdentId>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Equal,
  Below,
  Above,
}

impl BinaryOp {
  fn from_kind(kind: NodeKind) -> Option<Self> {
    let op = match kind {
      NodeKind::Add => Self::Add,
      NodeKind::Sub => Self::Sub,
      NodeKind::Mul => Self::Mul,
      NodeKind::Div => Self::Div,
      NodeKind::Equal => Self::Equal,
      NodeKind::Below => Self::Below,
      NodeKind::Above => Self::Above,
      _ => return None,
    };
    Some(op)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
  Num {
    value: i64,
  },
  Var {
    id: IdentId,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Expr>,
    rhs: Box<Expr>,
  },
  Sqrt {
    operand: Box<Expr>,
    /// Declarations under the unused left child.
    sites: Vec<IdentId>,
  },
  Call {
    callee: IdentId,
    args: Vec<IdentId>,
  },
}

impl Expr {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn var(id: IdentId) -> Self {
    Self::Var { id }
  }

  pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn sqrt(operand: Expr) -> Self {
    Self::Sqrt {
      operand: Box::new(operand),
      sites: Vec::new(),
    }
  }
}

impl Program {
  /// Lower a raw tree rooted at `PROGRAM_ROOT`.
  pub fn from_tree(tree: &Tree<Value>, idents: &IdentTable) -> CompileResult<Self> {
    let root = &tree.root;
    if root.value.kind != NodeKind::ProgramRoot {
      return Err(CompileError::shape("the tree root", "PROGRAM_ROOT", Some(root.value.kind)));
    }

    let mut functions = Vec::new();
    let mut decl = root.right();
    while let Some(node) = decl {
      expect_kind(node, NodeKind::Declaration, "the declaration list", "DECLARATION")?;
      let def = node
        .right()
        .ok_or_else(|| CompileError::shape("a declaration", "FUNCTION", None))?;
      functions.push(lower_function(def, idents)?);
      decl = node.left();
    }

    Ok(Self { functions })
  }
}

fn lower_function(node: &RawNode, idents: &IdentTable) -> CompileResult<Function> {
  expect_kind(node, NodeKind::Definition, "a declaration", "FUNCTION")?;

  let name_node = node
    .right()
    .ok_or_else(|| CompileError::shape("a function definition", "the function name", None))?;
  let name = ident_of(Some(name_node), "a function definition")?;
  expect_no_left(name_node, "a function name")?;
  let text = idents.resolve(name);
  if RESERVED_LABELS.contains(&text) {
    return Err(CompileError::ReservedName {
      name: text.to_string(),
    });
  }

  let params = var_list(node.left(), "a parameter list")?;
  let body = lower_block(name_node.right(), "a function body")?;

  Ok(Function { name, params, body })
}

fn lower_block(node: Option<&RawNode>, context: &'static str) -> CompileResult<Block> {
  let node = node.ok_or_else(|| CompileError::shape(context, "BLOCK", None))?;
  expect_kind(node, NodeKind::Block, context, "BLOCK")?;
  expect_no_left(node, context)?;

  let mut stmts = Vec::new();
  let mut op = node.right();
  while let Some(current) = op {
    expect_kind(current, NodeKind::Operation, "a statement list", "OP")?;
    let stmt = current
      .right()
      .ok_or_else(|| CompileError::shape("a statement list", "a statement", None))?;
    stmts.push(lower_stmt(stmt)?);
    op = current.left();
  }

  Ok(Block { stmts })
}

fn lower_stmt(node: &RawNode) -> CompileResult<Stmt> {
  let stmt = match node.value.kind {
    NodeKind::If => {
      let cond = lower_expr(node.left(), "an IF condition")?;
      let branching = node
        .right()
        .ok_or_else(|| CompileError::shape("an IF statement", "C", None))?;
      expect_kind(branching, NodeKind::Branching, "an IF statement", "C")?;
      let then = lower_block(branching.right(), "an IF then-branch")?;
      let otherwise = match branching.left() {
        Some(block) => Some(lower_block(Some(block), "an IF else-branch")?),
        None => None,
      };
      Stmt::If {
        cond,
        then,
        otherwise,
      }
    }
    NodeKind::While => Stmt::While {
      cond: lower_expr(node.left(), "a WHILE condition")?,
      body: lower_block(node.right(), "a WHILE body")?,
    },
    NodeKind::VarDecl => {
      let target = leaf_ident(node.right(), "a variable declaration")?;
      let init = match node.left() {
        Some(expr) => Some(lower_expr(Some(expr), "a variable initializer")?),
        None => None,
      };
      Stmt::VarDecl { target, init }
    }
    NodeKind::Assign => Stmt::Assign {
      target: leaf_ident(node.left(), "an assignment")?,
      value: lower_expr(node.right(), "an assignment")?,
    },
    NodeKind::Input => Stmt::Input {
      target: io_target(node, "an INPUT statement")?,
    },
    NodeKind::Output => Stmt::Output {
      target: io_target(node, "an OUTPUT statement")?,
    },
    NodeKind::Return => Stmt::Return {
      value: io_target(node, "a RETURN statement")?,
    },
    kind => {
      let mut sites = Vec::new();
      declaration_sites(Some(node), &mut sites)?;
      Stmt::Unsupported { kind, sites }
    }
  };
  Ok(stmt)
}

fn lower_expr(node: Option<&RawNode>, context: &'static str) -> CompileResult<Expr> {
  let node = node.ok_or_else(|| CompileError::shape(context, "an expression", None))?;
  let kind = node.value.kind;

  if let Some(op) = BinaryOp::from_kind(kind) {
    let lhs = lower_expr(node.left(), "the left operand of an operator")?;
    let rhs = lower_expr(node.right(), "the right operand of an operator")?;
    return Ok(Expr::binary(op, lhs, rhs));
  }

  match kind {
    NodeKind::Number => {
      expect_leaf(node, "a number")?;
      Ok(Expr::number(node.value.payload))
    }
    NodeKind::Identifier => Ok(Expr::var(leaf_ident(Some(node), context)?)),
    NodeKind::Sqrt => {
      let mut sites = Vec::new();
      declaration_sites(node.left(), &mut sites)?;
      Ok(Expr::Sqrt {
        operand: Box::new(lower_expr(node.right(), "a SQR operand")?),
        sites,
      })
    }
    NodeKind::Call => Ok(Expr::Call {
      callee: leaf_ident(node.left(), "a CALL")?,
      args: var_list(node.right(), "a call argument list")?,
    }),
    other => Err(CompileError::shape(context, "an expression", Some(other))),
  }
}

/// Flatten a `VARLIST` chain, nearest element first.
fn var_list(node: Option<&RawNode>, context: &'static str) -> CompileResult<Vec<IdentId>> {
  let mut ids = Vec::new();
  let mut current = node;
  while let Some(list) = current {
    expect_kind(list, NodeKind::VarList, context, "VARLIST")?;
    let Some(element) = list.right() else {
      break;
    };
    ids.push(leaf_ident(Some(element), context)?);
    current = list.left();
  }
  Ok(ids)
}

/// Collect the variables declared under `node` in frame order: an
/// `INITIALIZE` declares its target without entering the initializer, a
/// `VARLIST` declares its element and continues left, an element-less
/// `VARLIST` ends its branch, anything else is walked left then right.
fn declaration_sites(node: Option<&RawNode>, sites: &mut Vec<IdentId>) -> CompileResult<()> {
  let Some(node) = node else {
    return Ok(());
  };
  match node.value.kind {
    NodeKind::VarDecl => sites.push(ident_of(node.right(), "a variable declaration")?),
    NodeKind::VarList => {
      if let Some(element) = node.right() {
        sites.push(ident_of(Some(element), "a variable list")?);
        declaration_sites(node.left(), sites)?;
      }
    }
    _ => {
      declaration_sites(node.left(), sites)?;
      declaration_sites(node.right(), sites)?;
    }
  }
  Ok(())
}

/// The variable of `INPUT`, `OUTPUT` and `RETURN`, which only use their right slot.
fn io_target(node: &RawNode, context: &'static str) -> CompileResult<IdentId> {
  expect_no_left(node, context)?;
  leaf_ident(node.right(), context)
}

fn leaf_ident(node: Option<&RawNode>, context: &'static str) -> CompileResult<IdentId> {
  if let Some(node) = node {
    expect_leaf(node, context)?;
  }
  ident_of(node, context)
}

fn ident_of(node: Option<&RawNode>, context: &'static str) -> CompileResult<IdentId> {
  node
    .and_then(|node| node.value.ident_id())
    .ok_or_else(|| CompileError::shape(context, "an identifier", node.map(|node| node.value.kind)))
}

fn expect_leaf(node: &RawNode, context: &'static str) -> CompileResult<()> {
  match node.left().or(node.right()) {
    Some(child) => Err(CompileError::shape(context, "a childless node", Some(child.value.kind))),
    None => Ok(()),
  }
}

fn expect_no_left(node: &RawNode, context: &'static str) -> CompileResult<()> {
  match node.left() {
    Some(child) => Err(CompileError::shape(context, "an empty left slot", Some(child.value.kind))),
    None => Ok(()),
  }
}

fn expect_kind(
  node: &RawNode,
  kind: NodeKind,
  context: &'static str,
  expected: &'static str,
) -> CompileResult<()> {
  if node.value.kind == kind {
    Ok(())
  } else {
    Err(CompileError::shape(context, expected, Some(node.value.kind)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::deserialize::load_tree;

  fn lower(source: &str) -> CompileResult<(Program, IdentTable)> {
    let mut idents = IdentTable::with_capacity(source.len());
    let tree = load_tree(source, &mut idents)?;
    let program = Program::from_tree(&tree, &idents)?;
    Ok((program, idents))
  }

  fn id(idents: &IdentTable, name: &str) -> IdentId {
    idents.get(name).unwrap()
  }

  #[test]
  fn lowers_functions_params_and_statements_in_chain_order() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION
        { DECLARATION {@} { FUNCTION {@} { main { @ } { BLOCK {@} {@} } } } }
        { FUNCTION { VARLIST { VARLIST {@} { b } } { a } }
                   { f { @ } { BLOCK {@} { OP { OP {@} { RETURN {@} { a } } } { INPUT {@} { b } } } } } } } }";
    let (program, idents) = lower(src).unwrap();

    assert_eq!(program.functions.len(), 2);
    let f = &program.functions[0];
    assert_eq!(idents.resolve(f.name), "f");
    assert_eq!(f.params, [id(&idents, "a"), id(&idents, "b")]);
    assert_eq!(
      f.body.stmts,
      [
        Stmt::Input { target: id(&idents, "b") },
        Stmt::Return { value: id(&idents, "a") },
      ]
    );

    let main = &program.functions[1];
    assert!(main.params.is_empty());
    assert!(main.body.stmts.is_empty());
  }

  #[test]
  fn if_roles_are_resolved_from_the_branching_node() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { IF { BELOW { x } { 3 } } { C { BLOCK {@} {@} } { BLOCK {@} { OP {@} { OUTPUT {@} { x } } } } } }
      } } } } } }";
    let (program, idents) = lower(src).unwrap();
    let x = id(&idents, "x");

    let Stmt::If { cond, then, otherwise } = &program.functions[0].body.stmts[0] else {
      panic!("expected an if statement");
    };
    assert_eq!(*cond, Expr::binary(BinaryOp::Below, Expr::var(x), Expr::number(3)));
    assert_eq!(then.stmts, [Stmt::Output { target: x }]);
    assert_eq!(otherwise.as_ref().map(|block| block.stmts.len()), Some(0));
  }

  #[test]
  fn call_arguments_keep_chain_order() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { ASSIGN { r } { CALL { g } { VARLIST { VARLIST { VARLIST {@} {@} } { q } } { p } } } }
      } } } } } }";
    let (program, idents) = lower(src).unwrap();
    let Stmt::Assign { value, .. } = &program.functions[0].body.stmts[0] else {
      panic!("expected an assignment");
    };
    assert_eq!(
      *value,
      Expr::Call {
        callee: id(&idents, "g"),
        args: vec![id(&idents, "p"), id(&idents, "q")],
      }
    );
  }

  #[test]
  fn unknown_statement_kinds_are_kept_as_unsupported() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { ADD { 1 } { 2 } } } } } } } }";
    let (program, _) = lower(src).unwrap();
    assert_eq!(
      program.functions[0].body.stmts,
      [Stmt::Unsupported {
        kind: NodeKind::Add,
        sites: vec![],
      }]
    );
  }

  #[test]
  fn unsupported_statements_keep_their_declaration_sites() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { CALL { g } { VARLIST { VARLIST { VARLIST {@} {@} } { q } } { p } } } } } } } } }";
    let (program, idents) = lower(src).unwrap();
    assert_eq!(
      program.functions[0].body.stmts,
      [Stmt::Unsupported {
        kind: NodeKind::Call,
        sites: vec![id(&idents, "p"), id(&idents, "q")],
      }]
    );
  }

  #[test]
  fn sqrt_keeps_declarations_from_its_left_slot() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { ASSIGN { r } { SQR { INITIALIZE {@} { t } } { r } } } } } } } } }";
    let (program, idents) = lower(src).unwrap();
    let Stmt::Assign { value, .. } = &program.functions[0].body.stmts[0] else {
      panic!("expected an assignment");
    };
    let r = id(&idents, "r");
    assert_eq!(
      *value,
      Expr::Sqrt {
        operand: Box::new(Expr::var(r)),
        sites: vec![id(&idents, "t")],
      }
    );
  }

  #[test]
  fn unread_slots_must_be_empty() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { OUTPUT { INITIALIZE {@} { t } } { x } } } } } } } }";
    let err = lower(src).unwrap_err();
    assert!(matches!(err, CompileError::Shape { expected: "an empty left slot", .. }), "{err}");

    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { ASSIGN { x { 1 } {@} } { 2 } } } } } } } }";
    let err = lower(src).unwrap_err();
    assert!(matches!(err, CompileError::Shape { expected: "a childless node", .. }), "{err}");
  }

  #[test]
  fn missing_branching_node_is_a_shape_error() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { main {@} { BLOCK {@} {
        OP {@} { IF { 1 } { BLOCK {@} {@} } } } } } } } }";
    let err = lower(src).unwrap_err();
    assert!(matches!(err, CompileError::Shape { expected: "C", .. }), "{err}");
  }

  #[test]
  fn helper_label_names_are_reserved() {
    let src = "{ PROGRAM_ROOT {@} { DECLARATION {@} { FUNCTION {@} { below {@} { BLOCK {@} {@} } } } } }";
    let err = lower(src).unwrap_err();
    assert!(matches!(err, CompileError::ReservedName { ref name } if name == "below"));
  }
}
