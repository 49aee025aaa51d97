//! RecordQueue trait - durable FIFO buffer between ingestion and dispatch

use crate::{ContractError, Record};

/// A record handed out by the queue, tagged with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRecord {
    /// Monotonic sequence number assigned at insertion
    pub seq: u64,
    /// The record itself
    pub record: Record,
}

/// FIFO record queue
///
/// `put` may be called concurrently by several producers. Consumption has
/// exactly one reader, which peeks the head with `next` and removes it with
/// `remove` once the record has been handled, so a record never leaves the
/// queue before its delivery pass is complete.
#[trait_variant::make(RecordQueue: Send)]
pub trait LocalRecordQueue {
    /// Append a record at the tail
    ///
    /// # Errors
    /// [`ContractError::Storage`] on unrecoverable storage faults,
    /// [`ContractError::QueueClosed`] after `close`.
    async fn put(&self, record: Record) -> Result<(), ContractError>;

    /// Wait for the head record
    ///
    /// Blocks while the queue is empty. Returns `Ok(None)` once the queue is
    /// closed; repeated calls without `remove` return the same head.
    async fn next(&self) -> Result<Option<QueuedRecord>, ContractError>;

    /// Remove a consumed record
    fn remove(&self, seq: u64) -> Result<(), ContractError>;

    /// Stop consumption and release resources (flushes persistent storage)
    fn close(&self) -> Result<(), ContractError>;

    /// Number of records currently held
    fn len(&self) -> usize;

    /// True if the queue holds no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
