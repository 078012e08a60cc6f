//! SFR Ingest - ePub ingestion pipeline

use anyhow::{Context, Result};
use clap::Parser;
use sfr_common::logging::{init_logging, LogConfig, LogLevel};
use sfr_ingest::config::Config;
use sfr_ingest::models::IngestBatch;
use sfr_ingest::orchestrator;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sfr-ingest")]
#[command(author, version, about = "SFR ePub ingestion pipeline")]
struct Cli {
    /// Batch file with input records (JSON, `{"records": [...]}`)
    #[arg(short, long)]
    input: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_level(log_level)
        .with_file_prefix("sfr-ingest");

    init_logging(&log_config)?;

    let config = Config::load()?;

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read batch file {}", cli.input.display()))?;
    let batch: IngestBatch =
        serde_json::from_str(&raw).context("Failed to parse batch file")?;

    info!(records = batch.records.len(), "Processing batch");

    let pipeline = orchestrator::build_pipeline(&config);
    let events = pipeline.run_batch(batch).await;

    let stored = events.iter().filter(|e| e.code == "stored").count();
    let existing = events.iter().filter(|e| e.code == "existing").count();
    let failed = events.len() - stored - existing;

    info!(stored, existing, failed, "Ingestion complete");
    Ok(())
}
