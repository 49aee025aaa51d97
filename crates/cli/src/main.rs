//! # Log Relay CLI
//!
//! Command-line entry point.
//!
//! Provides:
//! - Configuration loading and validation
//! - Relay orchestration and lifecycle management
//! - Graceful shutdown on Ctrl+C / SIGTERM

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_relay, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(
        ObservabilityConfig {
            log_format: cli.log_format.into(),
            ..ObservabilityConfig::default()
        }
        .with_verbosity(cli.verbose, cli.quiet),
    )?;

    info!(version = env!("CARGO_PKG_VERSION"), "Log relay starting");

    let result = match &cli.command {
        Commands::Run(args) => run_relay(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
