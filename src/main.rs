//! cellgrid - evaluate formulas and small sheet scripts from the command line.

mod table;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use cellgrid_core::{Document, EngineConfig};
use cellgrid_engine::builtins::BUILTINS;
use cellgrid_engine::engine::{CellValue, NoCells, evaluate, format_value};

#[derive(Parser)]
#[command(name = "cellgrid")]
#[command(author, version, about = "Reactive in-memory spreadsheet engine")]
struct Cli {
    /// Evaluate one formula (leading `=` optional) and print the result
    #[arg(short = 'c', long = "command", conflicts_with = "script")]
    command: Option<String>,

    /// Run a script of `A1 = value` lines and print the resulting sheet
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Engine config file (TOML); defaults to the platform config dir
    #[arg(long)]
    config: Option<PathBuf>,

    /// List the built-in functions and exit
    #[arg(long, conflicts_with_all = ["command", "script"])]
    functions: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.functions {
        print_functions(&mut io::stdout().lock())?;
        return Ok(());
    }

    if let Some(formula) = cli.command {
        run_command(&formula);
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => EngineConfig::load_default().context("Failed to load default config")?,
    };

    match cli.script {
        Some(path) => run_script(&path, config),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// Print the value of a single formula. Exits with status 1 on error.
fn run_command(formula: &str) -> ! {
    match evaluate(formula, &NoCells) {
        Ok(value) => {
            for line in output_lines(&value) {
                println!("{}", line);
            }
            std::process::exit(0);
        }
        Err(e) => {
            println!("#ERR: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_functions(out: &mut impl Write) -> io::Result<()> {
    let width = BUILTINS.iter().map(|b| b.signature.len()).max().unwrap_or(0);
    for b in BUILTINS {
        writeln!(out, "{:<width$}  {}", b.signature, b.description, width = width)?;
    }
    Ok(())
}

/// Sequences print one item per line, tables one tab-separated row per line.
fn output_lines(value: &CellValue) -> Vec<String> {
    match value {
        CellValue::Sequence(items) => items.iter().map(format_value).collect(),
        CellValue::Table(rows) => rows
            .iter()
            .map(|row| row.iter().map(format_value).collect::<Vec<_>>().join("\t"))
            .collect(),
        other => vec![format_value(other)],
    }
}

fn run_script(path: &Path, config: EngineConfig) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script '{}'", path.display()))?;

    let mut doc = Document::new(config);
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((reference, value)) = line.split_once('=') else {
            bail!("line {}: expected `A1 = value`, got '{}'", lineno + 1, line);
        };
        doc.set_cell_a1(reference.trim(), value.trim())
            .with_context(|| format!("line {}", lineno + 1))?;
    }

    tracing::debug!(cells = doc.cell_count(), "script finished");
    table::write_markdown(&mut io::stdout().lock(), &doc)?;
    Ok(())
}
