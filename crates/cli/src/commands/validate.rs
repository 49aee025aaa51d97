//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    input_count: usize,
    output_count: usize,
    spillover: bool,
    send_timeout_ms: u64,
    metrics_enabled: bool,
}

impl From<&RelayConfig> for ConfigSummary {
    fn from(config: &RelayConfig) -> Self {
        Self {
            input_count: config.inputs.len(),
            output_count: config.outputs.len(),
            spillover: config.spillover(),
            send_timeout_ms: config.send_timeout_ms,
            metrics_enabled: config.metrics.enabled,
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(format!("File not found: {config_path}")),
            config_path,
            warnings: None,
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = ConfigLoader::warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary::from(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Inputs: {}", summary.input_count);
            println!("  Outputs: {}", summary.output_count);
            println!("  Spillover: {}", summary.spillover);
            println!("  Send timeout: {} ms", summary.send_timeout_ms);
            println!("  Metrics: {}", summary.metrics_enabled);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}
