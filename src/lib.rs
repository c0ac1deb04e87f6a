//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and run once, in order:
//! - `deserialize` reads the bracketed tree text into a raw `tree::Tree`,
//!   interning identifiers into an `ident::IdentTable`.
//! - `ast` resolves child roles into typed statements and expressions.
//! - `frame` assigns every function's variables their frame offsets.
//! - `codegen` lowers each function into stack-machine assembly.
//! - `error` holds the fatal errors and recoverable diagnostics shared by all of them.

pub mod ast;
pub mod codegen;
pub mod deserialize;
pub mod error;
pub mod frame;
pub mod ident;
pub mod tree;
pub mod value;

use std::fs;
use std::path::Path;

use snafu::ResultExt;

pub use codegen::{Compilation, Outcome};
pub use error::{CompileError, CompileResult, Diagnostic, RefContext};

/// Compile a serialized tree into assembly.
///
/// Undefined variables do not fail the run; they come back in
/// `Compilation::diagnostics` and the affected statements are left out.
pub fn compile(source: &str) -> CompileResult<Compilation> {
  let mut idents = ident::IdentTable::with_capacity(source.len());
  let tree = deserialize::load_tree(source, &mut idents)?;
  let program = ast::Program::from_tree(&tree, &idents)?;
  Ok(codegen::generate(&program, &idents))
}

/// Read `path` and compile its contents.
pub fn compile_file(path: impl AsRef<Path>) -> CompileResult<Compilation> {
  let path = path.as_ref();
  let source = fs::read_to_string(path).context(error::ReadInputSnafu { path })?;
  compile(&source)
}
