use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use mips_expr::encode::encode;
use mips_expr::{Bindings, CompilerConfig, Config, Instruction, ParenPolicy, Register, translate};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
  Text,
  Json,
}

#[derive(Debug, Parser)]
#[command(name = "mips-expr")]
#[command(about = "Compile an expression into MIPS-style pseudo-assembly")]
struct Args {
  /// Expression such as `x = (a + b) * 2`, or an assembly listing (use - for stdin)
  #[arg(default_value = "-")]
  input: String,

  /// Config file (defaults to the nearest mips-expr.toml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Bind a variable to a register, e.g. `--bind a=$s0`
  #[arg(short, long = "bind", value_name = "NAME=$REG", value_parser = parse_binding)]
  bindings: Vec<(String, Register)>,

  /// Reject unbalanced parentheses instead of skipping them
  #[arg(long)]
  strict: bool,

  #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
  format: OutputFormat,

  /// Print the machine-code field breakdown under each instruction
  #[arg(short = 'B', long)]
  breakdown: bool,

  /// Increase log verbosity (-v debug, -vv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn parse_binding(pair: &str) -> Result<(String, Register), String> {
  Bindings::parse_pair(pair).map_err(|err| err.to_string())
}

fn init_logging(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

fn read_input(input: &str) -> Result<String> {
  if input == "-" {
    let mut buf = String::new();
    io::stdin()
      .read_to_string(&mut buf)
      .context("failed to read stdin")?;
    Ok(buf)
  } else {
    Ok(input.to_string())
  }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
  let config = match path {
    Some(path) => Config::load(path)?,
    None => {
      let cwd = std::env::current_dir().context("failed to resolve current directory")?;
      Config::find_and_load(&cwd)?
    }
  };
  Ok(config)
}

fn print_program(
  out: &mut impl Write,
  program: &[Instruction],
  format: OutputFormat,
  breakdown: bool,
) -> Result<()> {
  match format {
    OutputFormat::Json => {
      let json = serde_json::to_string_pretty(program).context("failed to serialize output")?;
      writeln!(out, "{json}")?;
    }
    OutputFormat::Text if program.is_empty() => writeln!(out, "No output generated.")?,
    OutputFormat::Text => {
      for instr in program {
        writeln!(out, "{instr}")?;
        if breakdown {
          writeln!(out, "{}\n", encode(instr)?)?;
        }
      }
    }
  }
  Ok(())
}

/// Config file settings first, then command-line flags on top.
fn resolve(config: &Config, args: &Args) -> Result<(CompilerConfig, Bindings)> {
  let mut options = config.compiler;
  if args.strict {
    options.paren_policy = ParenPolicy::Strict;
  }
  let mut bindings = config.bindings()?;
  bindings.extend(args.bindings.iter().cloned());
  Ok((options, bindings))
}

fn run(args: Args) -> Result<()> {
  let config = load_config(args.config.as_ref())?;
  let (options, bindings) = resolve(&config, &args)?;

  let text = read_input(&args.input)?;
  if text.trim().is_empty() {
    bail!("please enter an expression or instruction");
  }

  let program = translate(&text, &bindings, &options)?;
  let stdout = io::stdout();
  print_program(&mut stdout.lock(), &program, args.format, args.breakdown)
}

fn main() {
  let args = Args::parse();
  init_logging(args.verbose);

  if let Err(err) = run(args) {
    eprintln!("{err}");
    process::exit(1);
  }
}
