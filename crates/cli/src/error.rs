//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[from] ContractError),

    /// A component could not be started
    #[error("Failed to start {component}: {message}")]
    Startup { component: String, message: String },

    /// Unrecoverable fault while running; the relay shut down
    #[error("Fatal error in {component}: {message}")]
    Fatal { component: String, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn startup(component: impl Into<String>, message: impl ToString) -> Self {
        Self::Startup {
            component: component.into(),
            message: message.to_string(),
        }
    }

    pub fn fatal(component: impl Into<String>, message: impl ToString) -> Self {
        Self::Fatal {
            component: component.into(),
            message: message.to_string(),
        }
    }
}
