//! SpoolQueue - queue selected from configuration

use std::path::Path;

use contracts::{ContractError, QueuedRecord, Record, RecordQueue};
use tracing::info;

use crate::disk::DiskQueue;
use crate::error::SpoolError;
use crate::memory::MemoryQueue;

/// The relay's queue: persistent when a data dir is configured
#[derive(Debug)]
pub enum SpoolQueue {
    Memory(MemoryQueue),
    Disk(DiskQueue),
}

impl SpoolQueue {
    /// Open a disk spool in `data_dir`, or a memory queue when none is set
    pub fn open(data_dir: Option<&Path>) -> Result<Self, SpoolError> {
        match data_dir {
            Some(path) => Ok(Self::Disk(DiskQueue::open(path)?)),
            None => {
                info!("No data dir configured, using in-memory queue");
                Ok(Self::Memory(MemoryQueue::new()))
            }
        }
    }

    /// True when records survive a restart
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Disk(_))
    }
}

impl RecordQueue for SpoolQueue {
    async fn put(&self, record: Record) -> Result<(), ContractError> {
        match self {
            Self::Memory(q) => q.put(record).await,
            Self::Disk(q) => q.put(record).await,
        }
    }

    async fn next(&self) -> Result<Option<QueuedRecord>, ContractError> {
        match self {
            Self::Memory(q) => q.next().await,
            Self::Disk(q) => q.next().await,
        }
    }

    fn remove(&self, seq: u64) -> Result<(), ContractError> {
        match self {
            Self::Memory(q) => q.remove(seq),
            Self::Disk(q) => q.remove(seq),
        }
    }

    fn close(&self) -> Result<(), ContractError> {
        match self {
            Self::Memory(q) => q.close(),
            Self::Disk(q) => q.close(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Memory(q) => q.len(),
            Self::Disk(q) => q.len(),
        }
    }
}
