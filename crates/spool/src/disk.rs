//! DiskQueue - sled-backed FIFO that survives restart
//!
//! Records live in one tree keyed by big-endian sequence numbers, so the
//! tree's natural key order is insertion order. After a restart the sequence
//! resumes after the last persisted key.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use contracts::{ContractError, QueuedRecord, Record, RecordQueue};
use sled::{Config as SledConfig, Db, IVec, Tree};
use tokio::sync::Notify;
use tracing::{debug, info, instrument};

use crate::error::SpoolError;

/// Tree holding queued records
const RECORDS_TREE: &str = "records";

/// Persistent record queue
#[derive(Debug)]
pub struct DiskQueue {
    db: Db,
    records: Tree,
    path: PathBuf,
    next_seq: AtomicU64,
    closed: AtomicBool,
    notify: Notify,
}

impl DiskQueue {
    /// Open (or create) a spool in `path`
    #[instrument(name = "disk_queue_open", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SpoolError> {
        let path = path.as_ref().to_path_buf();
        // sled expects the spool directory to exist
        fs::create_dir_all(&path)?;

        let db = sled_config(&path).open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        let next_seq = match records.last()? {
            Some((key, _)) => decode_seq(&key)? + 1,
            None => 0,
        };

        info!(
            path = %path.display(),
            pending = records.len(),
            next_seq,
            "DiskQueue opened"
        );

        Ok(Self {
            db,
            records,
            path,
            next_seq: AtomicU64::new(next_seq),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    /// Spool directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn head(&self) -> Result<Option<QueuedRecord>, SpoolError> {
        match self.records.first()? {
            Some((key, value)) => Ok(Some(QueuedRecord {
                seq: decode_seq(&key)?,
                record: Record::copy_from_slice(&value),
            })),
            None => Ok(None),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl RecordQueue for DiskQueue {
    async fn put(&self, record: Record) -> Result<(), ContractError> {
        if self.is_closed() {
            return Err(ContractError::QueueClosed);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
        self.records
            .insert(seq.to_be_bytes(), record.as_bytes())
            .map_err(SpoolError::from)?;
        self.notify.notify_one();
        Ok(())
    }

    async fn next(&self) -> Result<Option<QueuedRecord>, ContractError> {
        loop {
            if self.is_closed() {
                return Ok(None);
            }
            if let Some(head) = self.head()? {
                return Ok(Some(head));
            }
            self.notify.notified().await;
        }
    }

    fn remove(&self, seq: u64) -> Result<(), ContractError> {
        self.records
            .remove(seq.to_be_bytes())
            .map_err(SpoolError::from)?;
        Ok(())
    }

    fn close(&self) -> Result<(), ContractError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let flushed = self.db.flush().map_err(SpoolError::from)?;
            debug!(
                path = %self.path.display(),
                remaining = self.records.len(),
                flushed_bytes = flushed,
                "DiskQueue closed"
            );
        }
        self.notify.notify_one();
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

fn sled_config(path: &Path) -> SledConfig {
    SledConfig::new()
        .path(path)
        .cache_capacity(64 * 1024 * 1024)
}

fn decode_seq(key: &IVec) -> Result<u64, SpoolError> {
    let bytes: [u8; 8] = key
        .as_ref()
        .try_into()
        .map_err(|_| SpoolError::CorruptKey { len: key.len() })?;
    Ok(u64::from_be_bytes(bytes))
}
