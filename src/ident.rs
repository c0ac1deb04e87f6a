//! Identifier interning shared by every stage after deserialization.

use std::fmt;

use tracing::debug;

use crate::error::{CompileError, CompileResult};

/// Small integer handle for an interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentId(pub usize);

impl fmt::Display for IdentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Insertion-ordered identifier table. Ids are handed out on first sight.
#[derive(Debug, Clone)]
pub struct IdentTable {
  names: Vec<String>,
  capacity: usize,
}

impl IdentTable {
  /// A table that may hold at most `capacity` identifiers.
  ///
  /// The deserializer sizes this to the input length, which no valid input
  /// can exceed.
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      names: Vec::new(),
      capacity,
    }
  }

  /// Return the id of `name`, assigning the next one if it is new.
  pub fn intern(&mut self, name: &str) -> CompileResult<IdentId> {
    if let Some(pos) = self.names.iter().position(|known| known == name) {
      return Ok(IdentId(pos));
    }

    if self.names.len() >= self.capacity {
      return Err(CompileError::TableFull {
        name: name.to_string(),
        capacity: self.capacity,
      });
    }

    let id = IdentId(self.names.len());
    debug!(%id, name, "interned identifier");
    self.names.push(name.to_string());
    Ok(id)
  }

  /// Text of an id produced by this table.
  ///
  /// Ids never leave the run that created them, so an unknown id only shows
  /// up in diagnostics; it renders as `<unknown>` instead of panicking.
  pub fn resolve(&self, id: IdentId) -> &str {
    self
      .names
      .get(id.0)
      .map(String::as_str)
      .unwrap_or("<unknown>")
  }

  pub fn get(&self, name: &str) -> Option<IdentId> {
    self.names.iter().position(|known| known == name).map(IdentId)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// Identifiers in first-seen order.
  pub fn iter(&self) -> impl Iterator<Item = (IdentId, &str)> {
    self
      .names
      .iter()
      .enumerate()
      .map(|(pos, name)| (IdentId(pos), name.as_str()))
  }
}
