//! Cminus MIPS Backend Driver
//!
//! Replays code-generation request scripts through the backend and writes
//! the resulting MIPS assembly. The request script plays the role of the
//! parser's semantic actions.

mod demos;
mod script;

use clap::{Parser, Subcommand};
use cmc_codegen::{CodegenContext, CodegenOptions};
use log::info;
use script::{Runner, Script, ScriptError};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cmc")]
#[command(about = "Cminus MIPS backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate assembly from a JSON request script
    Run {
        /// Request script
        script: PathBuf,

        /// Output assembly file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        codegen: CodegenArgs,
    },

    /// Generate assembly for one of the built-in programs
    Demo {
        /// Which program to generate (arith, loop, branch)
        #[arg(default_value = "arith")]
        name: String,

        /// Output assembly file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        codegen: CodegenArgs,
    },
}

#[derive(clap::Args)]
struct CodegenArgs {
    /// Maximum nesting depth of buffered constructs
    #[arg(long, default_value_t = 100)]
    max_depth: usize,

    /// Capacity of each buffering level in bytes
    #[arg(long, default_value_t = 8 * 1024)]
    buffer_capacity: usize,

    /// Emit a comment before each generated operation
    #[arg(long)]
    annotate: bool,

    /// Print run statistics as JSON to stderr
    #[arg(long)]
    stats: bool,
}

impl CodegenArgs {
    fn options(&self) -> CodegenOptions {
        CodegenOptions {
            max_depth: self.max_depth,
            buffer_capacity: self.buffer_capacity,
            annotate: self.annotate,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let result = match &cli.command {
        Commands::Run { script, output, codegen } => run_script(script, output.as_deref(), codegen),
        Commands::Demo { name, output, codegen } => run_demo(name, output.as_deref(), codegen),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run_script(path: &Path, output: Option<&Path>, args: &CodegenArgs) -> Result<(), ScriptError> {
    info!("Reading request script {}", path.display());
    let text = fs::read_to_string(path)?;
    let script = Script::from_json(&text)?;
    generate(&script, output, args)
}

fn run_demo(name: &str, output: Option<&Path>, args: &CodegenArgs) -> Result<(), ScriptError> {
    let script = demos::by_name(name).ok_or_else(|| ScriptError::UnknownDemo(name.to_string()))?;
    generate(&script, output, args)
}

fn generate(script: &Script, output: Option<&Path>, args: &CodegenArgs) -> Result<(), ScriptError> {
    // Assemble in memory: a failed run must not leave a partial file behind
    let ctx = CodegenContext::with_options(Vec::new(), args.options());
    let (asm, stats) = Runner::new(ctx).run(script)?;

    match output {
        Some(path) => {
            fs::write(path, &asm)?;
            info!("Assembly written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&asm)?;
            stdout.flush()?;
        }
    }

    if args.stats {
        let json = serde_json::to_string_pretty(&stats)?;
        eprintln!("{json}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> CodegenArgs {
        CodegenArgs {
            max_depth: 100,
            buffer_capacity: 8 * 1024,
            annotate: false,
            stats: false,
        }
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["cmc", "run", "prog.json", "-o", "prog.s", "--max-depth", "4"]).unwrap();
        match cli.command {
            Commands::Run { script, output, codegen } => {
                assert_eq!(script, PathBuf::from("prog.json"));
                assert_eq!(output, Some(PathBuf::from("prog.s")));
                assert_eq!(codegen.options().max_depth, 4);
                assert_eq!(codegen.options().buffer_capacity, 8 * 1024);
            }
            Commands::Demo { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn test_demo_written_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("arith.s");
        generate(&demos::arith(), Some(&path), &args()).unwrap();

        let asm = fs::read_to_string(&path).unwrap();
        assert!(asm.contains("\tmuli $t2, $t2, 3\n"));
    }

    #[test]
    fn test_failed_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fail.s");
        let script = Script::from_json(r#"{ "requests": [ { "op": "end_if" } ] }"#).unwrap();

        assert!(generate(&script, Some(&path), &args()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_demo_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fib.s");
        assert!(matches!(
            run_demo("fib", Some(&path), &args()),
            Err(ScriptError::UnknownDemo(name)) if name == "fib"
        ));
        assert!(!path.exists());
    }
}
