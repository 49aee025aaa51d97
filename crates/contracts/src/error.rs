//! Layered error definitions
//!
//! Categorized by source: config / destination / listener / storage

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Endpoint address could not be understood
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    // ===== Destination Errors =====
    /// Destination could not be reached
    #[error("destination '{destination}' connection error: {message}")]
    DestinationConnection {
        destination: String,
        message: String,
    },

    /// Destination accepted the connection but the write failed
    #[error("destination '{destination}' write error: {message}")]
    DestinationWrite {
        destination: String,
        message: String,
    },

    /// Destination wrote fewer bytes than the record holds
    #[error("destination '{destination}' short write: {written} of {expected} bytes")]
    ShortWrite {
        destination: String,
        written: usize,
        expected: usize,
    },

    /// Destination did not finish within the send timeout
    #[error("destination '{destination}' timed out after {timeout_ms}ms")]
    DestinationTimeout {
        destination: String,
        timeout_ms: u64,
    },

    // ===== Listener Errors =====
    /// Listener could not bind or accept
    #[error("listener '{listener}' error: {message}")]
    Listener { listener: String, message: String },

    /// The fan-in channel is closed, no more records can be accepted
    #[error("record sink closed")]
    SinkClosed,

    // ===== Storage Errors =====
    /// Queue storage fault (unrecoverable)
    #[error("queue storage error: {message}")]
    Storage { message: String },

    /// Queue was closed
    #[error("queue closed")]
    QueueClosed,

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid endpoint error
    pub fn invalid_endpoint(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create destination connection error
    pub fn destination_connection(
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DestinationConnection {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create destination write error
    pub fn destination_write(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DestinationWrite {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create destination timeout error
    pub fn destination_timeout(destination: impl Into<String>, timeout_ms: u64) -> Self {
        Self::DestinationTimeout {
            destination: destination.into(),
            timeout_ms,
        }
    }

    /// Create listener error
    pub fn listener(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Listener {
            listener: listener.into(),
            message: message.into(),
        }
    }

    /// Create storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// True for faults the relay must not survive
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_is_fatal() {
        assert!(ContractError::storage("disk full").is_fatal());
        assert!(!ContractError::QueueClosed.is_fatal());
        assert!(!ContractError::destination_write("tcp://a:1", "reset").is_fatal());
    }

    #[test]
    fn test_short_write_message() {
        let err = ContractError::ShortWrite {
            destination: "udp://127.0.0.1:1".into(),
            written: 3,
            expected: 10,
        };
        assert_eq!(
            err.to_string(),
            "destination 'udp://127.0.0.1:1' short write: 3 of 10 bytes"
        );
    }
}
