//! Relay metrics
//!
//! [`RelayMetrics`] is the production [`MetricsRecorder`]: every event goes to
//! the `metrics` facade (rendered by the Prometheus exporter when installed)
//! and into in-process counters used for the shutdown summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use contracts::MetricsRecorder;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Records accepted from listeners
pub const IN_TOTAL: &str = "in_total_messages";
/// Records delivered to every destination
pub const OUT_TOTAL: &str = "out_total_messages";
/// Healthy -> failing transitions, labelled by destination
pub const ERRORS_TOTAL: &str = "total_errors";
/// Successful sends, labelled by destination
pub const DELIVERIES_TOTAL: &str = "deliveries_total";
/// Records put back in the queue
pub const REQUEUED_TOTAL: &str = "requeued_total";
/// Records discarded after an incomplete pass
pub const DROPPED_TOTAL: &str = "dropped_total";
/// Duration of one delivery pass
pub const DISPATCH_LATENCY: &str = "dispatch_latency_seconds";

/// Register metric descriptions with the installed recorder
pub fn describe_relay_metrics() {
    describe_counter!(IN_TOTAL, "Records accepted from listeners");
    describe_counter!(OUT_TOTAL, "Records delivered to every destination");
    describe_counter!(ERRORS_TOTAL, "Destination failure transitions");
    describe_counter!(DELIVERIES_TOTAL, "Successful sends per destination");
    describe_counter!(REQUEUED_TOTAL, "Records requeued after an incomplete pass");
    describe_counter!(DROPPED_TOTAL, "Records dropped after an incomplete pass");
    describe_histogram!(DISPATCH_LATENCY, Unit::Seconds, "Delivery pass duration");
}

/// Production metrics recorder
#[derive(Debug, Default)]
pub struct RelayMetrics {
    inbound: AtomicU64,
    outbound: AtomicU64,
    errors: AtomicU64,
    deliveries: AtomicU64,
    requeued: AtomicU64,
    dropped: AtomicU64,
    latency_ms: Mutex<RunningStats>,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        let latency = self
            .latency_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        MetricsSummary {
            inbound: self.inbound.load(Ordering::Relaxed),
            outbound: self.outbound.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            latency_ms: StatsSummary::from(&*latency),
        }
    }
}

impl MetricsRecorder for RelayMetrics {
    fn inc_inbound(&self) {
        self.inbound.fetch_add(1, Ordering::Relaxed);
        counter!(IN_TOTAL).increment(1);
    }

    fn inc_outbound(&self) {
        self.outbound.fetch_add(1, Ordering::Relaxed);
        counter!(OUT_TOTAL).increment(1);
    }

    fn inc_delivery(&self, destination: &str) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        counter!(DELIVERIES_TOTAL, "destination" => destination.to_string()).increment(1);
    }

    fn inc_error(&self, destination: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        counter!(ERRORS_TOTAL, "destination" => destination.to_string()).increment(1);
    }

    fn inc_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
        counter!(REQUEUED_TOTAL).increment(1);
    }

    fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        counter!(DROPPED_TOTAL).increment(1);
    }

    fn observe_latency(&self, elapsed: Duration) {
        histogram!(DISPATCH_LATENCY).record(elapsed.as_secs_f64());
        self.latency_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(elapsed.as_secs_f64() * 1000.0);
    }
}

/// Relay metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub inbound: u64,
    pub outbound: u64,
    pub errors: u64,
    pub deliveries: u64,
    pub requeued: u64,
    pub dropped: u64,
    pub latency_ms: StatsSummary,
}

impl MetricsSummary {
    /// Share of inbound records fully delivered, in percent
    pub fn delivery_rate(&self) -> f64 {
        if self.inbound > 0 {
            self.outbound as f64 / self.inbound as f64 * 100.0
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Relay Metrics Summary ===")?;
        writeln!(f, "Inbound records: {}", self.inbound)?;
        writeln!(
            f,
            "Fully delivered: {} ({:.2}%)",
            self.outbound,
            self.delivery_rate()
        )?;
        writeln!(f, "Destination sends: {}", self.deliveries)?;
        writeln!(f, "Destination failures: {}", self.errors)?;
        writeln!(f, "Requeued: {}", self.requeued)?;
        writeln!(f, "Dropped: {}", self.dropped)?;
        writeln!(f, "Pass latency (ms): {}", self.latency_ms)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_outbound_and_deliveries_are_distinct() {
        let metrics = RelayMetrics::new();
        metrics.inc_inbound();
        metrics.inc_delivery("tcp://a:1");
        metrics.inc_delivery("tcp://b:1");
        metrics.inc_outbound();
        metrics.observe_latency(Duration::from_millis(4));

        let summary = metrics.summary();
        assert_eq!(summary.inbound, 1);
        assert_eq!(summary.outbound, 1);
        assert_eq!(summary.deliveries, 2);
        assert_eq!(summary.latency_ms.count, 1);
        assert!((summary.delivery_rate() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_exported_names() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let metrics = RelayMetrics::new();

        metrics::with_local_recorder(&recorder, || {
            metrics.inc_inbound();
            metrics.inc_outbound();
            metrics.inc_error("udp://collector:12201");
            metrics.inc_delivery("log://");
            metrics.inc_requeued();
            metrics.inc_dropped();
        });

        let rendered = handle.render();
        assert!(rendered.contains("in_total_messages 1"));
        assert!(rendered.contains("out_total_messages 1"));
        assert!(rendered.contains(r#"total_errors{destination="udp://collector:12201"} 1"#));
        assert!(rendered.contains(r#"deliveries_total{destination="log://"} 1"#));
        assert!(rendered.contains("requeued_total 1"));
        assert!(rendered.contains("dropped_total 1"));
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            inbound: 200,
            outbound: 150,
            errors: 1,
            deliveries: 350,
            requeued: 50,
            dropped: 0,
            latency_ms: StatsSummary {
                count: 200,
                min: 0.1,
                max: 12.0,
                mean: 1.5,
                std_dev: 0.8,
            },
        };

        let output = format!("{}", summary);
        assert!(output.contains("Inbound records: 200"));
        assert!(output.contains("75.00%"));
        assert!(output.contains("n=200"));
    }
}
