//! Node payloads of the serialized tree: a kind tag plus an integer.

use std::fmt;

use crate::ident::{IdentId, IdentTable};

/// Closed set of node kinds the serialized format can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
  Declaration,
  Definition,
  VarList,
  Identifier,
  ProgramRoot,
  Operation,
  Branching,
  Block,
  If,
  While,
  ExpressionMarker,
  Assign,
  VarDecl,
  Return,
  Call,
  ArithmeticOp,
  Number,
  Input,
  Output,
  Add,
  Mul,
  Div,
  Sub,
  Sqrt,
  Below,
  Above,
  Equal,
}

/// Keyword spelling of each kind that has one.
const KEYWORDS: &[(&str, NodeKind)] = &[
  ("DECLARATION", NodeKind::Declaration),
  ("IF", NodeKind::If),
  ("WHILE", NodeKind::While),
  ("FUNCTION", NodeKind::Definition),
  ("VARLIST", NodeKind::VarList),
  ("OP", NodeKind::Operation),
  ("ASSIGN", NodeKind::Assign),
  ("RETURN", NodeKind::Return),
  ("INITIALIZE", NodeKind::VarDecl),
  ("CALL", NodeKind::Call),
  ("INPUT", NodeKind::Input),
  ("OUTPUT", NodeKind::Output),
  ("PROGRAM_ROOT", NodeKind::ProgramRoot),
  ("C", NodeKind::Branching),
  ("BLOCK", NodeKind::Block),
  ("ADD", NodeKind::Add),
  ("SUB", NodeKind::Sub),
  ("MUL", NodeKind::Mul),
  ("DIV", NodeKind::Div),
  ("BELOW", NodeKind::Below),
  ("ABOVE", NodeKind::Above),
  ("EQUAL", NodeKind::Equal),
  ("SQR", NodeKind::Sqrt),
];

impl NodeKind {
  /// Classify an alphabetic run. Anything that is not a keyword is an identifier.
  pub fn from_word(word: &str) -> Self {
    KEYWORDS
      .iter()
      .find(|(keyword, _)| *keyword == word)
      .map_or(NodeKind::Identifier, |(_, kind)| *kind)
  }

  pub fn keyword(self) -> Option<&'static str> {
    KEYWORDS
      .iter()
      .find(|(_, kind)| *kind == self)
      .map(|(keyword, _)| *keyword)
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.keyword() {
      Some(keyword) => f.write_str(keyword),
      None => write!(f, "{self:?}"),
    }
  }
}

/// Tag plus payload. `Number` carries the literal, `Identifier` an interned id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
  pub kind: NodeKind,
  pub payload: i64,
}

impl Value {
  pub fn new(kind: NodeKind) -> Self {
    Self { kind, payload: 0 }
  }

  pub fn number(value: i64) -> Self {
    Self {
      kind: NodeKind::Number,
      payload: value,
    }
  }

  pub fn ident(id: IdentId) -> Self {
    Self {
      kind: NodeKind::Identifier,
      payload: id.0 as i64,
    }
  }

  pub fn ident_id(&self) -> Option<IdentId> {
    match self.kind {
      NodeKind::Identifier => usize::try_from(self.payload).ok().map(IdentId),
      _ => None,
    }
  }

  /// Record-shaped Graphviz label for the tree dump.
  pub fn render(&self, idents: &IdentTable) -> String {
    match self.kind {
      NodeKind::Declaration => "{ DEFINITION }".to_string(),
      NodeKind::Definition => "{ FUNCTION }".to_string(),
      NodeKind::Operation => "{ OPERATION }".to_string(),
      NodeKind::VarList => "{ VARLIST }".to_string(),
      NodeKind::Branching => "{ BRANCHING }".to_string(),
      NodeKind::Block => "{ BLOCK }".to_string(),
      NodeKind::ProgramRoot => "{ PROGRAM }".to_string(),
      NodeKind::If => "{ IF }".to_string(),
      NodeKind::While => "{ WHILE }".to_string(),
      NodeKind::Assign => "{ = }".to_string(),
      NodeKind::VarDecl => "{ VAR }".to_string(),
      NodeKind::Return => "{ RETURN }".to_string(),
      NodeKind::Call => "{ CALL }".to_string(),
      NodeKind::Input => "{ INPUT }".to_string(),
      NodeKind::Output => "{ OUTPUT }".to_string(),
      NodeKind::Below => "{ \\< }".to_string(),
      NodeKind::Above => "{ \\> }".to_string(),
      NodeKind::Equal => "{ == }".to_string(),
      NodeKind::Add => "{ + }".to_string(),
      NodeKind::Sub => "{ - }".to_string(),
      NodeKind::Mul => "{ * }".to_string(),
      NodeKind::Div => "{ / }".to_string(),
      NodeKind::Sqrt => "{ sqrt }".to_string(),
      NodeKind::ExpressionMarker => "{ EXPRESSION }".to_string(),
      NodeKind::ArithmeticOp => "{ ARITHMETIC }".to_string(),
      NodeKind::Number => format!("{{ INTEGER: {} }}", self.payload),
      NodeKind::Identifier => {
        let name = self.ident_id().map_or("<unknown>", |id| idents.resolve(id));
        format!("{{ ID }} | {name}")
      }
    }
  }
}
