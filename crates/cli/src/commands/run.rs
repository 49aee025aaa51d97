//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RelayConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::Relay;

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    let config = effective_config(args)?;

    info!(
        inputs = config.inputs.len(),
        outputs = config.outputs.len(),
        spillover = config.spillover(),
        send_timeout_ms = config.send_timeout_ms,
        metrics = config.metrics.enabled,
        "Configuration loaded"
    );
    for warning in ConfigLoader::warnings(&config) {
        warn!("{warning}");
    }

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_signal(shutdown.clone()));

    info!("Starting relay...");
    let mut stats = Relay::new(config)
        .run(shutdown)
        .await
        .context("Relay failed to start")?;
    signal_task.abort();

    stats.print_summary();

    match stats.fatal.take() {
        Some(e) => Err(e.into()),
        None => {
            info!("Log relay finished");
            Ok(())
        }
    }
}

/// Configuration file (if any) with command-line overrides applied, validated
fn effective_config(args: &RunArgs) -> Result<RelayConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::parse_path(path)?
        }
        None => RelayConfig::default(),
    };

    apply_overrides(&mut config, args)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}

fn apply_overrides(config: &mut RelayConfig, args: &RunArgs) -> Result<(), CliError> {
    if !args.inputs.is_empty() {
        config.inputs = args
            .inputs
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<_, _>>()?;
    }
    if !args.outputs.is_empty() {
        config.outputs = args
            .outputs
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<_, _>>()?;
    }
    if let Some(timeout_ms) = args.send_timeout_ms {
        config.send_timeout_ms = timeout_ms;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.data_dir = Some(data_dir.clone());
    }
    if args.verbose_records {
        config.verbose = true;
    }
    if args.metrics {
        config.metrics.enabled = true;
    }
    if let Some(ref addr) = args.metrics_addr {
        config.metrics.listen_addr = addr.clone();
    }
    if let Some(ref path) = args.metrics_path {
        config.metrics.path = path.clone();
    }
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping relay...");
    shutdown.cancel();
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &RelayConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Inputs ({}):", config.inputs.len());
    for input in &config.inputs {
        println!("  - {input}");
    }

    println!("\nOutputs ({}):", config.outputs.len());
    for output in &config.outputs {
        println!("  - {output}");
    }

    println!("\nDelivery:");
    println!("  Send timeout: {} ms", config.send_timeout_ms);
    match config.data_dir {
        Some(ref dir) => println!("  Spool: {} (spillover on)", dir.display()),
        None => println!("  Spool: memory (spillover off)"),
    }
    println!("  Fan-in capacity: {}", config.fanin_capacity());

    if config.metrics.enabled {
        println!(
            "\nMetrics: http://{}{}",
            config.metrics.listen_addr, config.metrics.path
        );
    }
    println!();
}
