//! Recursive-descent reader for the bracketed tree serialization.
//!
//! ```text
//! tree  := '{' node '}'
//! node  := '@' | value ( '{' node '}' '{' node '}' )?
//! value := [0-9]+ | [A-Za-z_]+
//! ```
//!
//! Words are classified through the keyword table in `value`; unknown words
//! are identifiers and get interned on the way. No semantic checks happen
//! here: child roles are the business of `ast`.

use crate::error::{CompileError, CompileResult};
use crate::ident::IdentTable;
use crate::tree::{Node, Tree};
use crate::value::{NodeKind, Value};

/// Parse a whole serialized tree, interning identifiers into `idents`.
pub fn load_tree(source: &str, idents: &mut IdentTable) -> CompileResult<Tree<Value>> {
  let mut cursor = Cursor::new(source);

  cursor.skip_blanks();
  cursor.expect(b'{')?;
  let root = parse_node(&mut cursor, idents)?;
  cursor.skip_blanks();
  cursor.expect(b'}')?;
  cursor.skip_blanks();

  if !cursor.is_eof() {
    return Err(cursor.error("unexpected input after the closing `}`"));
  }

  match root {
    Some(root) => Ok(Tree::new(root)),
    None => Err(CompileError::EmptyTree),
  }
}

fn parse_node(cursor: &mut Cursor, idents: &mut IdentTable) -> CompileResult<Option<Node<Value>>> {
  cursor.skip_blanks();

  let value = match cursor.peek() {
    Some(b'@') => {
      cursor.bump();
      return Ok(None);
    }
    Some(c) if c.is_ascii_digit() => Value::number(cursor.number()?),
    Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
      let word = cursor.word();
      match NodeKind::from_word(word) {
        NodeKind::Identifier => Value::ident(idents.intern(word)?),
        kind => Value::new(kind),
      }
    }
    Some(_) => return Err(cursor.error("expected a node, `@`, a number or a word")),
    None => return Err(cursor.error("unexpected end of input while reading a node")),
  };

  cursor.skip_blanks();
  if !cursor.eat(b'{') {
    return Ok(Some(Node::leaf(value)));
  }

  let left = parse_node(cursor, idents)?;
  cursor.skip_blanks();
  cursor.expect(b'}')?;
  cursor.skip_blanks();
  cursor.expect(b'{')?;
  let right = parse_node(cursor, idents)?;
  cursor.skip_blanks();
  cursor.expect(b'}')?;

  Ok(Some(Node::new(value, left, right)))
}

/// Byte cursor over the serialized text.
struct Cursor<'a> {
  source: &'a str,
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn new(source: &'a str) -> Self {
    Self { source, pos: 0 }
  }

  fn peek(&self) -> Option<u8> {
    self.source.as_bytes().get(self.pos).copied()
  }

  fn bump(&mut self) {
    self.pos += 1;
  }

  fn is_eof(&self) -> bool {
    self.pos >= self.source.len()
  }

  fn skip_blanks(&mut self) {
    while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
      self.pos += 1;
    }
  }

  /// Consume `c` if it is the current byte.
  fn eat(&mut self, c: u8) -> bool {
    if self.peek() == Some(c) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn expect(&mut self, c: u8) -> CompileResult<()> {
    if self.eat(c) {
      return Ok(());
    }
    let got = match self.source[self.pos.min(self.source.len())..].chars().next() {
      Some(ch) => format!("'{ch}'"),
      None => "end of input".to_string(),
    };
    Err(self.error(format!("expected '{}', but got {got}", c as char)))
  }

  fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
    let start = self.pos;
    while self.peek().is_some_and(&pred) {
      self.pos += 1;
    }
    &self.source[start..self.pos]
  }

  fn word(&mut self) -> &'a str {
    self.take_while(|c| c.is_ascii_alphabetic() || c == b'_')
  }

  fn number(&mut self) -> CompileResult<i64> {
    let start = self.pos;
    let digits = self.take_while(|c| c.is_ascii_digit());
    digits
      .parse::<i64>()
      .map_err(|err| CompileError::at(self.source, start, format!("invalid number: {err}")))
  }

  fn error(&self, message: impl Into<String>) -> CompileError {
    CompileError::at(self.source, self.pos, message)
  }
}
