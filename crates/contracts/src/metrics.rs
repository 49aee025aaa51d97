//! MetricsRecorder trait - injected instrumentation capability

use std::time::Duration;

/// Relay instrumentation
///
/// Passed explicitly into the ingestion bridge and the dispatch loop so the
/// core holds no process-wide state. `inc_outbound` counts records fully
/// delivered to every destination; `inc_delivery` counts individual
/// successful sends. The two are never conflated.
pub trait MetricsRecorder: Send + Sync {
    /// A record entered the relay
    fn inc_inbound(&self);

    /// A record was accepted by every destination
    fn inc_outbound(&self);

    /// One destination accepted one record
    fn inc_delivery(&self, destination: &str);

    /// A destination went from healthy to failing
    fn inc_error(&self, destination: &str);

    /// An incompletely delivered record went back to the queue
    fn inc_requeued(&self);

    /// An incompletely delivered record was discarded
    fn inc_dropped(&self);

    /// Duration of one delivery pass
    fn observe_latency(&self, elapsed: Duration);
}

/// Recorder that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsRecorder for NoopMetrics {
    fn inc_inbound(&self) {}

    fn inc_outbound(&self) {}

    fn inc_delivery(&self, _destination: &str) {}

    fn inc_error(&self, _destination: &str) {}

    fn inc_requeued(&self) {}

    fn inc_dropped(&self) {}

    fn observe_latency(&self, _elapsed: Duration) {}
}
