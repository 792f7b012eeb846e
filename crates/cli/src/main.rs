use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use extrato_core::{prepare_batch, ParseSummary};
use extrato_import::{ImportConfig, StatementImporter};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Normalize a bank statement into categorized transactions (JSON on stdout).
#[derive(Parser, Debug)]
#[command(name = "extrato", version)]
struct Cli {
    /// Statement file (.csv, .xlsx, .xls, .ofx, .pdf, .txt)
    file: PathBuf,

    /// TOML file overriding locale, month names, categories or column headers
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit storage-ready records owned by this user
    #[arg(short, long)]
    user_id: Option<String>,

    /// Account the storage records belong to
    #[arg(short, long, requires = "user_id")]
    account_id: Option<String>,

    /// Print totals instead of the transaction list
    #[arg(short, long, conflicts_with = "user_id")]
    summary: bool,

    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Keep stderr as log lines only; extractor panics are recovered as errors.
    std::panic::set_hook(Box::new(|info| tracing::error!(%info, "panic")));

    let cli = Cli::parse();
    println!("{}", run(&cli)?);
    Ok(())
}

fn load_importer(config: Option<&Path>) -> Result<StatementImporter> {
    let Some(path) = config else {
        return Ok(StatementImporter::new());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = ImportConfig::from_toml(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded import config");
    Ok(StatementImporter::with_config(config)?)
}

fn run(cli: &Cli) -> Result<String> {
    let importer = load_importer(cli.config.as_deref())?;

    let bytes = fs::read(&cli.file).with_context(|| format!("Failed to read {}", cli.file.display()))?;
    let filename = cli
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let transactions = importer
        .parse(&bytes, filename)
        .with_context(|| format!("Failed to import {}", cli.file.display()))?;

    if cli.summary {
        return render(&ParseSummary::from_transactions(&transactions), cli.pretty);
    }
    match cli.user_id.as_deref() {
        Some(user_id) => render(
            &prepare_batch(&transactions, user_id, cli.account_id.as_deref()),
            cli.pretty,
        ),
        None => render(&transactions, cli.pretty),
    }
}

fn render<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
