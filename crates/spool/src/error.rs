//! Spool error types

use thiserror::Error;

/// Errors raised while opening or operating a spool
#[derive(Debug, Error)]
pub enum SpoolError {
    /// Embedded database error
    #[error("spool database error: {0}")]
    Db(#[from] sled::Error),

    /// Filesystem error
    #[error("spool filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored key is not a sequence number
    #[error("corrupt spool key of {len} bytes")]
    CorruptKey { len: usize },
}

impl From<SpoolError> for contracts::ContractError {
    fn from(err: SpoolError) -> Self {
        contracts::ContractError::storage(err.to_string())
    }
}
