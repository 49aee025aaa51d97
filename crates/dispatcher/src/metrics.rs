//! Per-destination counters for the run summary

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters for a single destination
#[derive(Debug)]
pub struct DestinationStats {
    /// Successful sends
    sent: AtomicU64,
    /// Failed sends
    failed: AtomicU64,
    /// Healthy -> Failing transitions
    outages: AtomicU64,
    healthy: AtomicBool,
}

impl Default for DestinationStats {
    fn default() -> Self {
        Self {
            sent: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            outages: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
        }
    }
}

impl DestinationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn outages(&self) -> u64 {
        self.outages.load(Ordering::Relaxed)
    }

    pub fn inc_outages(&self) {
        self.outages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> DestinationSnapshot {
        DestinationSnapshot {
            sent: self.sent(),
            failed: self.failed(),
            outages: self.outages(),
            healthy: self.is_healthy(),
        }
    }
}

/// Snapshot of destination counters (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationSnapshot {
    pub sent: u64,
    pub failed: u64,
    pub outages: u64,
    pub healthy: bool,
}
