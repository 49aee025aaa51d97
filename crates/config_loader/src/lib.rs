//! # Config Loader
//!
//! Loads the relay configuration.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate the result
//! - Produce a [`RelayConfig`]
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("relay.toml")).unwrap();
//! println!("{} inputs", config.inputs.len());
//! ```

mod parser;
mod validator;

pub use contracts::RelayConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is detected from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<RelayConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
        let config = parser::parse(content, format)?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Read a configuration file without validating it
    ///
    /// Used when command-line overrides are applied before validation.
    pub fn parse_path(path: &Path) -> Result<RelayConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        parser::parse(&content, format)
    }

    /// Validate an assembled configuration
    pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Non-fatal findings for a valid configuration
    pub fn warnings(config: &RelayConfig) -> Vec<String> {
        validator::collect_warnings(config)
    }

    /// Serialize RelayConfig to TOML string
    pub fn to_toml(config: &RelayConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize RelayConfig to JSON string
    pub fn to_json(config: &RelayConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
