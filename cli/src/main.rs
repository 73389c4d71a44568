use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use stamp::syntax;
use stamp::{Error, Generator, Result, Vm};

#[derive(Debug, Parser)]
#[clap(name = "stamp", version, about = "The Stamp language toolchain")]
struct App {
  /// Print the abstract syntax tree after parsing.
  #[clap(short = 'a')]
  dump_ast: bool,

  /// Print the generated bytecode (basic blocks and scopes).
  #[clap(short = 'b')]
  dump_bytecode: bool,

  /// Print all register values after an interpreter run.
  #[clap(short = 'r')]
  dump_registers: bool,

  /// Write generated bytecode to this file. With no value, the name is
  /// derived from the input file by replacing `.stamp` with `.ostamp`.
  #[clap(short = 'o', value_name = "out.ostamp", num_args = 0..=1)]
  output: Option<Option<PathBuf>>,

  /// Read bytecode from this file instead of parsing source.
  #[clap(short = 'f', value_name = "in.ostamp")]
  bytecode_input: Option<PathBuf>,

  /// Comma-separated list of directories searched by `use`.
  #[clap(short = 'd', value_delimiter = ',', value_name = "dir,dir")]
  dirs: Vec<PathBuf>,

  /// A source file. With no input, start a REPL.
  input: Option<PathBuf>,
}

fn main() -> ExitCode {
  let app = App::parse();
  match execute(app) {
    Ok(()) => ExitCode::SUCCESS,
    // the single terminating sink: `Kind: message`, non-zero exit
    Err(e) => {
      eprintln!("{e}");
      ExitCode::FAILURE
    }
  }
}

fn execute(app: App) -> Result<()> {
  let mut dirs = vec![PathBuf::from(".")];
  dirs.extend(app.dirs.iter().cloned());
  let mut generator = Generator::new(dirs);

  if let Some(path) = &app.bytecode_input {
    generator.read_from_file(path)?;
  } else if let Some(input) = &app.input {
    let source = std::fs::read_to_string(input)
      .map_err(|e| Error::Parsing(format!("cannot read {}: {e}", input.display())))?;
    let ast = syntax::parse(&source)?;
    if app.dump_ast {
      print!("{ast}");
    }
    generator.generate(&ast)?;
  } else {
    return repl(&app, generator);
  }

  if app.dump_bytecode {
    print!("{}", generator.dump());
  }
  if let Some(path) = output_path(&app)? {
    generator.write_to_file(&path)?;
  }

  let mut vm = Vm::new();
  vm.run(&generator)?;
  if app.dump_registers {
    print!("{}", vm.dump());
  }
  Ok(())
}

/// Where `-o` should write, if it was given at all.
fn output_path(app: &App) -> Result<Option<PathBuf>> {
  match &app.output {
    None => Ok(None),
    Some(Some(path)) => Ok(Some(path.clone())),
    Some(None) => match (&app.input, &app.bytecode_input) {
      (Some(input), _) => Ok(Some(derive_output(input))),
      (None, Some(input)) => Ok(Some(derive_output(input))),
      (None, None) => Err(Error::FileParsing(
        "no file to derive the -o output name from".to_string(),
      )),
    },
  }
}

fn derive_output(input: &Path) -> PathBuf {
  input.with_extension("ostamp")
}

/// One generator and one interpreter persist across lines: lowering appends
/// blocks, and the interpreter resumes where the previous line stopped.
fn repl(app: &App, mut generator: Generator) -> Result<()> {
  let mut editor = Editor::<()>::new()
    .map_err(|e| Error::Execution(format!("cannot start the repl: {e}")))?;
  let mut vm = Vm::new();

  println!("Stamp REPL v{}\nPress CTRL-D to exit", env!("CARGO_PKG_VERSION"));

  loop {
    let line = match editor.readline("> ") {
      Ok(line) => line,
      Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return Ok(()),
      Err(e) => return Err(Error::Execution(format!("readline: {e}"))),
    };
    editor.add_history_entry(&line);

    // a typo should not kill the session; anything past parsing goes
    // through the terminating sink as usual
    let ast = match syntax::parse(&line) {
      Ok(ast) => ast,
      Err(e) => {
        eprintln!("{}", Error::from(e));
        continue;
      }
    };
    if app.dump_ast {
      print!("{ast}");
    }

    generator.generate(&ast)?;
    if app.dump_bytecode {
      print!("{}", generator.dump());
    }
    if let Some(Some(path)) = &app.output {
      generator.write_to_file(path)?;
    }

    vm.run(&generator)?;
    if app.dump_registers {
      print!("{}", vm.dump());
    }
  }
}
