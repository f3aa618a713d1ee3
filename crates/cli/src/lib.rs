//! # `carte-cli` Library Crate
//!
//! The logic behind the `carte` binary: argument parsing, configuration,
//! the extractor registry and the extraction run.

pub mod config;
pub mod registry;
pub mod run;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

pub use config::{load_config, CarteConfig, ConnectionConfig};
pub use registry::{create_extractor, create_extractors};
pub use run::{run_extraction, RunError, RunSummary};

// --- CLI Argument Structs ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract metadata from the configured sources and write it to files
    Extract(ExtractArgs),
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// The path to the config YAML file.
    pub config_path: PathBuf,
    /// The output directory. Defaults to the current working directory.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract(args) => handle_extract(args).await,
    }
}

// --- Command Handlers ---

/// Handles the `carte extract` command logic.
async fn handle_extract(args: ExtractArgs) -> Result<()> {
    info!("Starting 'extract' command with args: {:?}", args);
    let config = load_config(&args.config_path).with_context(|| {
        format!("Failed to load configuration '{}'", args.config_path.display())
    })?;
    let extractors =
        create_extractors(&config.connections).context("Failed to create extractors")?;

    println!("Running extraction...");
    let summary = run_extraction(extractors, &args.output)
        .await
        .context("Extraction run failed")?;

    println!(
        "Done! {} tables written from {} connections, {} stale tables removed.",
        summary.tables_written,
        summary.extractors,
        summary.removed.len()
    );
    Ok(())
}
