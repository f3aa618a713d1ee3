//! # carte: Data Catalog Extraction CLI
//!
//! This is the main entry point for the `carte` command-line interface.
//! The binary is a thin entrypoint; all logic lives in the `carte_cli`
//! library crate.

use anyhow::Result;
use carte_cli::{run, Cli};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup logging
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("carte=info".parse()?))
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Call the library's run function and handle the final result
    if let Err(e) = run(cli).await {
        eprintln!("[carte error] Failed to execute command: {e:?}");
        std::process::exit(1);
    }

    Ok(())
}
