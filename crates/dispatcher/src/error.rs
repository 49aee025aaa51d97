//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The queue failed to requeue or release a record (unrecoverable)
    #[error("queue storage fault: {message}")]
    Storage { message: String },
}

impl DispatcherError {
    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Whether the relay has to shut down
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

impl From<DispatcherError> for contracts::ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::Storage { message } => contracts::ContractError::storage(message),
        }
    }
}
