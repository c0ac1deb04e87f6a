use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use astvm::deserialize::load_tree;
use astvm::error::{ReadInputSnafu, WriteOutputSnafu};
use astvm::ident::IdentTable;
use astvm::{CompileResult, ast, codegen};
use clap::Parser;
use snafu::ResultExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Compile a serialized syntax tree into stack-machine assembly.
#[derive(Parser, Debug)]
#[command(name = "astvm", version, about)]
struct Cli {
  /// Serialized AST to read
  #[arg(short, long, default_value = "input.ast")]
  input: PathBuf,

  /// Where to write the assembly
  #[arg(short, long, default_value = "output.asm")]
  output: PathBuf,

  /// Also write the loaded tree as a Graphviz digraph
  #[arg(short, long, value_name = "PATH")]
  dump: Option<PathBuf>,

  /// Exit with an error status when any variable is undefined
  #[arg(long)]
  deny_undefined: bool,
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("astvm=info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  match run(&cli) {
    Ok(diagnostics) if diagnostics > 0 && cli.deny_undefined => ExitCode::FAILURE,
    Ok(_) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("error: {err}");
      ExitCode::FAILURE
    }
  }
}

/// Returns the number of diagnostics raised.
fn run(cli: &Cli) -> CompileResult<usize> {
  let source = fs::read_to_string(&cli.input).context(ReadInputSnafu { path: &cli.input })?;

  let mut idents = IdentTable::with_capacity(source.len());
  let tree = load_tree(&source, &mut idents)?;

  if let Some(path) = &cli.dump {
    let mut writer = BufWriter::new(File::create(path).context(WriteOutputSnafu { path })?);
    tree
      .dump_dot(&mut writer, |value| value.render(&idents))
      .and_then(|()| writer.flush())
      .context(WriteOutputSnafu { path })?;
    info!(path = %path.display(), "wrote tree dump");
  }

  let program = ast::Program::from_tree(&tree, &idents)?;
  let compilation = codegen::generate(&program, &idents);

  for diagnostic in &compilation.diagnostics {
    eprintln!("error: {diagnostic}");
  }

  fs::write(&cli.output, &compilation.assembly).context(WriteOutputSnafu { path: &cli.output })?;
  info!(
    output = %cli.output.display(),
    functions = program.functions.len(),
    diagnostics = compilation.diagnostics.len(),
    "compilation finished"
  );

  Ok(compilation.diagnostics.len())
}
