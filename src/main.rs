use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

#[macro_use]
mod value;
mod desugarer;
mod error;
mod interpreter;
mod model;
mod parser;
mod preprocessor;
mod tokeniser;

use interpreter::{Interpreter, PRELUDE};

/// A small Lisp whose programs are made of the same cons cells they compute with.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program to run instead of starting the REPL
    file: Option<PathBuf>,

    /// Startup definitions to load instead of the bundled prelude
    #[arg(long, value_name = "FILE", conflicts_with = "no_prelude")]
    builtins: Option<PathBuf>,

    /// Start with an empty global scope
    #[arg(long)]
    no_prelude: bool,

    /// Log more detail (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    let mut interpreter = startup(&args)?;

    match &args.file {
        Some(path) => run_file(&mut interpreter, path),
        None => repl(&mut interpreter),
    }
}

/// Build the global environment, loading startup definitions through the
/// normal pipeline.
fn startup(args: &Args) -> Result<Interpreter> {
    if args.no_prelude {
        info!("starting without a prelude");
        return Ok(Interpreter::new());
    }

    let source = match &args.builtins {
        Some(path) => read_program(path)?,
        None => PRELUDE.to_string(),
    };
    let interpreter =
        Interpreter::with_startup(&source).context("Failed to load startup definitions")?;
    match &args.builtins {
        Some(path) => info!(path = %path.display(), "loaded startup definitions"),
        None => info!("loaded bundled prelude"),
    }
    Ok(interpreter)
}

fn read_program(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read program at {}", path.display()))
}

fn run_file(interpreter: &mut Interpreter, path: &Path) -> Result<()> {
    let program = read_program(path)?;
    if let Some(result) = interpreter.run(&program)? {
        println!("{result}");
    }
    Ok(())
}

fn repl(interpreter: &mut Interpreter) -> Result<()> {
    let mut editor = DefaultEditor::new().context("Could not initialise the line editor")?;

    loop {
        match editor.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(err) = editor.add_history_entry(line.as_str()) {
                    debug!(?err, "could not record history");
                }

                match interpreter.run(&line) {
                    Ok(Some(value)) => println!("{value}"),
                    Ok(None) => {}
                    Err(err) => {
                        debug!(?err, "form failed");
                        println!("error: {err}");
                    }
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => bail!("Failed to read input: {err}"),
        }
    }

    Ok(())
}
