//! Confounder Synth CLI
//!
//! Command-line interface for generating and finalizing latent-confounder data.

use anyhow::Result;
use clap::Parser;
use confounder_synth::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Run the selected command
    cli.run().await?;

    Ok(())
}
