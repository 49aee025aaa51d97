//! Configuration validation
//!
//! Rules:
//! - at least one input
//! - inputs unique
//! - send_timeout_ms > 0
//! - 0 < fanin_per_listener <= MAX_FANIN_PER_LISTENER
//! - metrics path starts with `/`

use std::collections::HashSet;

use contracts::{ContractError, OutputEndpoint, RelayConfig, MAX_FANIN_PER_LISTENER};

/// Validate a RelayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_inputs(config)?;
    validate_delivery(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_inputs(config: &RelayConfig) -> Result<(), ContractError> {
    if config.inputs.is_empty() {
        return Err(ContractError::config_validation(
            "inputs",
            "at least one input is required",
        ));
    }

    let mut seen = HashSet::new();
    for (index, input) in config.inputs.iter().enumerate() {
        if !seen.insert(input) {
            return Err(ContractError::config_validation(
                format!("inputs[{index}]"),
                format!("duplicate input {input}"),
            ));
        }
    }
    Ok(())
}

fn validate_delivery(config: &RelayConfig) -> Result<(), ContractError> {
    if config.send_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "send_timeout_ms",
            "send_timeout_ms must be > 0",
        ));
    }
    if config.fanin_per_listener == 0 {
        return Err(ContractError::config_validation(
            "fanin_per_listener",
            "fanin_per_listener must be > 0",
        ));
    }
    if config.fanin_per_listener > MAX_FANIN_PER_LISTENER {
        return Err(ContractError::config_validation(
            "fanin_per_listener",
            format!(
                "fanin_per_listener must be <= {MAX_FANIN_PER_LISTENER}, got {}",
                config.fanin_per_listener
            ),
        ));
    }
    Ok(())
}

fn validate_metrics(config: &RelayConfig) -> Result<(), ContractError> {
    let metrics = &config.metrics;
    if !metrics.path.starts_with('/') {
        return Err(ContractError::config_validation(
            "metrics.path",
            format!("must start with '/', got '{}'", metrics.path),
        ));
    }
    if metrics.listen_addr.trim().is_empty() {
        return Err(ContractError::config_validation(
            "metrics.listen_addr",
            "listen address must not be empty",
        ));
    }
    Ok(())
}

/// Non-fatal findings worth surfacing to the operator
pub fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.outputs.is_empty() {
        warnings.push("no outputs configured: every record is discarded after one pass".to_string());
    } else if config.outputs.iter().all(|o| matches!(o, OutputEndpoint::Log)) {
        warnings.push("only log:// outputs configured: records are not forwarded".to_string());
    }

    let mut seen = HashSet::new();
    for output in &config.outputs {
        if !seen.insert(output) {
            warnings.push(format!("output {output} listed more than once: records are sent twice"));
        }
    }

    if config.data_dir.is_none() && !config.outputs.is_empty() {
        warnings.push("no data_dir: records failing any destination are dropped".to_string());
    }
    warnings
}
