//! # Observability
//!
//! Tracing + Prometheus metrics for the relay.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact)
//! - Prometheus recorder installation and an HTTP exposition endpoint
//! - [`RelayMetrics`], the injected metrics recorder with a run summary
//!
//! ## Usage Example
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig::default())?;
//! let handle = observability::install_prometheus()?;
//! let server = MetricsServer::start(handle, "0.0.0.0:9112", "/metrics", token.clone()).await?;
//! let metrics = Arc::new(RelayMetrics::new());
//! ```

pub mod metrics;
mod server;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    describe_relay_metrics, MetricsSummary, RelayMetrics, RunningStats, StatsSummary,
};
pub use crate::server::MetricsServer;

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Filter used when RUST_LOG is unset
    pub default_log_level: String,
    /// Ignore RUST_LOG and only log warnings
    pub quiet: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            default_log_level: "info".to_string(),
            quiet: false,
        }
    }
}

impl ObservabilityConfig {
    /// Map `-v` occurrences to a default level
    pub fn with_verbosity(mut self, verbose: u8, quiet: bool) -> Self {
        self.default_log_level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
        .to_string();
        self.quiet = quiet;
        self
    }

    fn filter(&self) -> EnvFilter {
        if self.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human readable
    Pretty,
    /// Compact single line
    Compact,
}

/// Initialize tracing with the given configuration
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(log_format = ?config.log_format, "Tracing initialized");
    Ok(())
}

/// Install the global Prometheus recorder
///
/// The returned handle renders the exposition text; serve it with
/// [`MetricsServer::start`].
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    describe_relay_metrics();

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}
