//! RelayConfig - Config Loader output
//!
//! Describes the complete relay: inputs, outputs, delivery and spool settings,
//! metrics exposition.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{InputEndpoint, OutputEndpoint};

/// Default fan-in channel slots per listener
pub const DEFAULT_FANIN_PER_LISTENER: usize = 100_000;

/// Largest accepted `fanin_per_listener`; the channel preallocates its slots
pub const MAX_FANIN_PER_LISTENER: usize = 1_000_000;

/// Complete relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Listener addresses
    #[serde(default)]
    pub inputs: Vec<InputEndpoint>,

    /// Destination addresses, in delivery order
    #[serde(default)]
    pub outputs: Vec<OutputEndpoint>,

    /// Echo every dispatched record to the diagnostic log
    #[serde(default)]
    pub verbose: bool,

    /// Per-send timeout in milliseconds
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Durable spool location. When set the queue is persistent and
    /// incompletely delivered records are requeued instead of dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Fan-in channel slots reserved per listener
    #[serde(default = "default_fanin_per_listener")]
    pub fanin_per_listener: usize,

    /// Metrics exposition
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_send_timeout_ms() -> u64 {
    1000
}

fn default_fanin_per_listener() -> usize {
    DEFAULT_FANIN_PER_LISTENER
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            verbose: false,
            send_timeout_ms: default_send_timeout_ms(),
            data_dir: None,
            fanin_per_listener: default_fanin_per_listener(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Per-send timeout
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Requeue incompletely delivered records (only with a durable spool)
    pub fn spillover(&self) -> bool {
        self.data_dir.is_some()
    }

    /// Fan-in channel capacity for the configured listeners
    pub fn fanin_capacity(&self) -> usize {
        self.inputs.len().max(1).saturating_mul(self.fanin_per_listener)
    }
}

/// Prometheus endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve metrics over HTTP
    #[serde(default)]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,

    /// HTTP path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9112".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_addr(),
            path: default_metrics_path(),
        }
    }
}
