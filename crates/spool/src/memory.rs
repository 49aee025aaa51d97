//! MemoryQueue - process-local FIFO

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, QueuedRecord, Record, RecordQueue};
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    entries: VecDeque<QueuedRecord>,
    next_seq: u64,
}

/// In-memory record queue
///
/// Safe for concurrent producers; one consumer. Contents are lost when the
/// process exits.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    state: Mutex<State>,
    closed: AtomicBool,
    notify: Notify,
}

impl MemoryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn head(&self) -> Option<QueuedRecord> {
        self.state().entries.front().cloned()
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl RecordQueue for MemoryQueue {
    async fn put(&self, record: Record) -> Result<(), ContractError> {
        if self.is_closed() {
            return Err(ContractError::QueueClosed);
        }
        {
            let mut state = self.state();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push_back(QueuedRecord { seq, record });
        }
        // Single consumer: a stored permit is enough to wake it
        self.notify.notify_one();
        Ok(())
    }

    async fn next(&self) -> Result<Option<QueuedRecord>, ContractError> {
        loop {
            if self.is_closed() {
                return Ok(None);
            }
            if let Some(head) = self.head() {
                return Ok(Some(head));
            }
            self.notify.notified().await;
        }
    }

    fn remove(&self, seq: u64) -> Result<(), ContractError> {
        let mut state = self.state();
        if let Some(pos) = state.entries.iter().position(|e| e.seq == seq) {
            state.entries.remove(pos);
        }
        Ok(())
    }

    fn close(&self) -> Result<(), ContractError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(remaining = self.len(), "MemoryQueue closed");
        }
        self.notify.notify_one();
        Ok(())
    }

    fn len(&self) -> usize {
        self.state().entries.len()
    }
}
