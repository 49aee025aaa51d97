//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Listener socket could not be bound
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        /// Configured endpoint
        endpoint: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// The queue rejected a record (unrecoverable)
    #[error("queue insertion failed: {message}")]
    Storage {
        /// Storage fault description
        message: String,
    },
}

impl IngestionError {
    /// Create bind error
    pub fn bind(endpoint: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Whether the relay has to shut down
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<IngestionError> for contracts::ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Storage { message } => contracts::ContractError::storage(message),
            IngestionError::Bind { endpoint, source } => {
                contracts::ContractError::listener(endpoint, source.to_string())
            }
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
