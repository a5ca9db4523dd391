//! # sable
//!
//! Command-line front end for sable script files.
//!
//! ```bash
//! sable check game.sbl
//! sable run game.sbl
//! sable run game.sbl --section Damage 12 "fire"
//! sable run game.sbl --section Spawn --json
//! sable fmt game.sbl
//! sable tokens game.sbl
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use sable_lang::syntax::lexer::Lexer;
use sable_lang::{Context, EngineConfig, Error, Registry, ScriptError, ScriptFile, Val};

#[derive(Parser)]
#[command(name = "sable")]
#[command(about = "Check, run and format sable script files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Engine config (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for trace output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Parse every section and report all diagnostics
    Check {
        file: PathBuf,
    },

    /// Run the global script, then optionally one section
    Run {
        file: PathBuf,

        /// Section to run after the global script
        #[arg(short, long)]
        section: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Section arguments, each parsed as a script expression
        args: Vec<String>,
    },

    /// Print the file re-serialized in canonical layout
    Fmt {
        file: PathBuf,
    },

    /// Dump the token stream
    Tokens {
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .init();
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match &cli.command {
        Command::Check { file } => check(file, config),
        Command::Run { file, section, json, args } => {
            run(file, config, section.as_deref(), args, *json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Fmt { file } => {
            let registry = load(file, config)?;
            print!("{}", registry.write());
            Ok(ExitCode::SUCCESS)
        }
        Command::Tokens { file } => {
            tokens(file)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn check(path: &Path, config: EngineConfig) -> Result<ExitCode> {
    let mut file = ScriptFile::new(Registry::with_config(config, &path.display().to_string()))
        .on_new_script(|header, line| tracing::debug!(line, header = header.trim(), "section"));
    let errors = file.check_file(path).map_err(script_error)?;

    for e in &errors {
        eprintln!("{}", render(e));
    }

    let registry = file.registry();
    println!("{}: {} statement(s)", registry.global().name(), registry.global().statements().len());
    for script in registry.scripts() {
        let signature = script.header().map_or_else(|| script.name().to_string(), |h| {
            let mut text = format!("{}{}", script.marker(), h.to_source());
            text.pop();
            text
        });
        println!("{signature}: {} statement(s)", script.statements().len());
    }

    if errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} error(s)", errors.len());
        Ok(ExitCode::FAILURE)
    }
}

fn run(path: &Path, config: EngineConfig, section: Option<&str>, args: &[String], json: bool) -> Result<()> {
    let registry = load(path, config)?;
    let mut ctx = Context::standard();

    let mut result = registry.global().run(&mut ctx).map_err(|e| anyhow!("{e}"))?;
    if let Some(name) = section {
        let values = args.iter()
            .map(|a| sable_lang::eval(a, &mut ctx).map_err(|e| script_error(e).context(format!("argument `{a}`"))))
            .collect::<Result<Vec<Val>>>()?;
        result = registry.run(name, &mut ctx, &values).map_err(script_error)?;
    } else if !args.is_empty() {
        bail!("arguments need a --section to bind to");
    }

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else if !result.is_null() {
        println!("{result}");
    }
    Ok(())
}

fn tokens(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let tokens = Lexer::tokenize(&text, &path.display().to_string()).map_err(|e| anyhow!(render(&e)))?;
    for t in tokens {
        println!("{:>4}:{:<3} {:<12} {}", t.span.line, t.span.column, format!("{:?}", t.kind), t.text);
    }
    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn load(path: &Path, config: EngineConfig) -> Result<Registry> {
    sable_lang::load(path, config).map_err(script_error)
}

/// Engine errors hold `Rc` spans, so they are flattened to text here.
fn script_error(e: ScriptError) -> anyhow::Error {
    match e {
        ScriptError::Parse(e) => anyhow!(render(&e)),
        other => anyhow!("{other}"),
    }
}

/// `[P002] file:line:col: message`, followed by the source line and a caret.
fn render(e: &Error) -> String {
    let mut out = e.to_string();
    if !e.line_text.is_empty() {
        let indent = e.column().saturating_sub(1);
        let width = e.token.chars().count().max(1);
        out.push_str(&format!("\n    {}\n    {}{}", e.line_text, " ".repeat(indent), "^".repeat(width)));
    }
    if let Some(expected) = &e.expected {
        out.push_str(&format!("\n    expected {expected}"));
    }
    out
}
