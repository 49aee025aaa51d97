//! Test doubles for the dispatch loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{ContractError, Destination, MetricsRecorder, QueuedRecord, Record, RecordQueue};
use spool::MemoryQueue;

#[derive(Default)]
struct MockState {
    received: Mutex<Vec<Record>>,
    attempts: AtomicUsize,
    closed: AtomicBool,
}

/// Destination that fails its first `n` sends, then accepts everything
#[derive(Clone)]
pub struct MockDestination {
    name: String,
    fail_first: usize,
    state: Arc<MockState>,
}

impl MockDestination {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_first: 0,
            state: Arc::default(),
        }
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Successfully delivered records, in order
    pub fn received(&self) -> Vec<Record> {
        self.state.received.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

impl Destination for MockDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
        let attempt = self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(ContractError::destination_connection(
                &self.name,
                "connection refused",
            ));
        }
        self.state.received.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Recorder keeping every counter in memory
#[derive(Default)]
pub struct RecordingMetrics {
    inbound: AtomicU64,
    outbound: AtomicU64,
    requeued: AtomicU64,
    dropped: AtomicU64,
    latencies: AtomicU64,
    deliveries: Mutex<HashMap<String, u64>>,
    errors: Mutex<HashMap<String, u64>>,
}

impl RecordingMetrics {
    pub fn outbound(&self) -> u64 {
        self.outbound.load(Ordering::SeqCst)
    }

    pub fn requeued(&self) -> u64 {
        self.requeued.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn latencies(&self) -> u64 {
        self.latencies.load(Ordering::SeqCst)
    }

    pub fn deliveries(&self, destination: &str) -> u64 {
        self.deliveries
            .lock()
            .unwrap()
            .get(destination)
            .copied()
            .unwrap_or(0)
    }

    pub fn errors(&self, destination: &str) -> u64 {
        self.errors
            .lock()
            .unwrap()
            .get(destination)
            .copied()
            .unwrap_or(0)
    }
}

impl MetricsRecorder for RecordingMetrics {
    fn inc_inbound(&self) {
        self.inbound.fetch_add(1, Ordering::SeqCst);
    }

    fn inc_outbound(&self) {
        self.outbound.fetch_add(1, Ordering::SeqCst);
    }

    fn inc_delivery(&self, destination: &str) {
        *self
            .deliveries
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default() += 1;
    }

    fn inc_error(&self, destination: &str) {
        *self
            .errors
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default() += 1;
    }

    fn inc_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::SeqCst);
    }

    fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }

    fn observe_latency(&self, _elapsed: Duration) {
        self.latencies.fetch_add(1, Ordering::SeqCst);
    }
}

/// Queue that serves preloaded records but cannot store new ones
pub struct RejectingQueue {
    inner: MemoryQueue,
}

impl RejectingQueue {
    pub async fn with_records(payloads: impl IntoIterator<Item = &'static str>) -> Self {
        let inner = MemoryQueue::new();
        for payload in payloads {
            inner.put(Record::from(payload)).await.unwrap();
        }
        Self { inner }
    }
}

impl RecordQueue for RejectingQueue {
    async fn put(&self, _record: Record) -> Result<(), ContractError> {
        Err(ContractError::storage("write-ahead log is read-only"))
    }

    async fn next(&self) -> Result<Option<QueuedRecord>, ContractError> {
        self.inner.next().await
    }

    fn remove(&self, seq: u64) -> Result<(), ContractError> {
        self.inner.remove(seq)
    }

    fn close(&self) -> Result<(), ContractError> {
        self.inner.close()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
