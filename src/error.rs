//! Shared error utilities used across the compilation pipeline.
//!
//! Two classes of failure exist. `CompileError` is fatal and aborts the run
//! before any assembly is written. `Diagnostic` is recoverable: the code
//! generators record it, drop the offending operation and keep going.

use std::fmt;
use std::path::PathBuf;

use snafu::Snafu;

use crate::value::NodeKind;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("{line}\n{marker} {message}"))]
  Syntax {
    line: String,
    marker: String,
    message: String,
  },

  #[snafu(display("identifier table is full ({capacity} entries) while interning `{name}`"))]
  TableFull { name: String, capacity: usize },

  #[snafu(display("the serialized tree has no root node"))]
  EmptyTree,

  #[snafu(display("malformed tree: expected {expected} in {context}, found {found}"))]
  Shape {
    context: &'static str,
    expected: &'static str,
    found: String,
  },

  #[snafu(display("function name `{name}` collides with a runtime helper label"))]
  ReservedName { name: String },

  #[snafu(display("cannot read {}: {source}", path.display()))]
  ReadInput {
    path: PathBuf,
    source: std::io::Error,
  },

  #[snafu(display("cannot write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Construct a syntax error anchored at a specific byte offset in the source.
  ///
  /// Only the line containing the offset is echoed back, since serialized
  /// trees are frequently spread over many lines.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = loc.min(source.len());
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |pos| pos + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |pos| safe_loc + pos);
    let line = format!("'{}'", &source[line_start..line_end]);
    let char_offset = source[line_start..safe_loc].chars().count() + 1; // account for opening quote
    let marker = format!("{}^", " ".repeat(char_offset));
    Self::Syntax {
      line,
      marker,
      message: message.into(),
    }
  }

  /// A node of the wrong kind (or a missing node) where the typed AST needs a specific shape.
  pub fn shape(context: &'static str, expected: &'static str, found: Option<NodeKind>) -> Self {
    let found = match found {
      Some(kind) => kind.to_string(),
      None => "nothing".to_string(),
    };
    Self::Shape {
      context,
      expected,
      found,
    }
  }
}

/// Syntactic position of a variable reference, used to word diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefContext {
  Expression,
  Assignment,
  CallArgument,
  InputCall,
  OutputCall,
  ReturnCall,
}

impl fmt::Display for RefContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      Self::Expression => "expression",
      Self::Assignment => "assignment",
      Self::CallArgument => "function call",
      Self::InputCall => "input call",
      Self::OutputCall => "output call",
      Self::ReturnCall => "return call",
    };
    f.write_str(text)
  }
}

/// A recoverable problem found during code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
  UndefinedVariable {
    name: String,
    function: String,
    context: RefContext,
  },
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::UndefinedVariable {
        name,
        function,
        context,
      } => write!(f, "undefined variable `{name}` in {context} (function `{function}`)"),
    }
  }
}
