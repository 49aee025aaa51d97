//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log Relay - durable fan-out of log records to multiple destinations
#[derive(Parser, Debug)]
#[command(
    name = "log-relay",
    author,
    version,
    about = "Durable log-message relay",
    long_about = "Accepts log records on UDP/TCP listeners, buffers them in a queue \n\
                  (optionally persisted on disk) and fans each record out to every \n\
                  configured destination."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOG_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOG_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay until all listeners stop or a shutdown signal arrives
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
///
/// Every option overrides the matching configuration file value.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "LOG_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listener address, e.g. udp://0.0.0.0:12201 (repeatable)
    #[arg(short, long = "input", env = "LOG_RELAY_INPUTS", value_delimiter = ',')]
    pub inputs: Vec<String>,

    /// Destination address, e.g. tcp://graylog:12201 (repeatable, in delivery order)
    #[arg(short, long = "output", env = "LOG_RELAY_OUTPUTS", value_delimiter = ',')]
    pub outputs: Vec<String>,

    /// Per-send timeout in milliseconds
    #[arg(long, env = "LOG_RELAY_SEND_TIMEOUT_MS")]
    pub send_timeout_ms: Option<u64>,

    /// Durable spool directory; enables requeue of undelivered records
    #[arg(long, env = "LOG_RELAY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log every dispatched record
    #[arg(long, env = "LOG_RELAY_VERBOSE_RECORDS")]
    pub verbose_records: bool,

    /// Serve Prometheus metrics over HTTP
    #[arg(long, env = "LOG_RELAY_METRICS")]
    pub metrics: bool,

    /// Metrics listen address
    #[arg(long, env = "LOG_RELAY_METRICS_ADDR")]
    pub metrics_addr: Option<String>,

    /// Metrics HTTP path
    #[arg(long, env = "LOG_RELAY_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Validate the effective configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides() {
        let cli = Cli::parse_from([
            "log-relay",
            "-v",
            "run",
            "--input",
            "udp://0.0.0.0:12201",
            "--input",
            "tcp://0.0.0.0:12201",
            "--output",
            "tcp://graylog:12201,log://",
            "--send-timeout-ms",
            "250",
            "--metrics",
        ]);

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.outputs, vec!["tcp://graylog:12201", "log://"]);
        assert_eq!(args.send_timeout_ms, Some(250));
        assert!(args.metrics);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["log-relay", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
