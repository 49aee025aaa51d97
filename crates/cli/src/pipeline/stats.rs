//! Run statistics printed at shutdown.

use std::time::Duration;

use dispatcher::{DestinationSnapshot, DispatchSummary};
use observability::MetricsSummary;

use crate::error::CliError;

/// Statistics from a relay run
#[derive(Debug, Default)]
pub struct RelayStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Records the bridge moved into the queue
    pub forwarded: u64,

    /// Dispatcher totals; `None` when it was abandoned after the grace period
    pub dispatch: Option<DispatchSummary>,

    /// Recorder snapshot
    pub metrics: MetricsSummary,

    /// Per-destination counters in configuration order
    pub destinations: Vec<(String, DestinationSnapshot)>,

    /// Listeners that ended with an error
    pub listener_failures: usize,

    /// Records still queued at shutdown
    pub pending: usize,

    /// Whether pending records survive a restart
    pub persistent: bool,

    /// Fault that ended the run
    pub fatal: Option<CliError>,
}

impl RelayStats {
    /// Records inbound per second
    pub fn rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.inbound as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Relay Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Records queued: {}", self.forwarded);
        println!("   ├─ Inbound rate: {:.2}/s", self.rate());
        println!("   ├─ Listener failures: {}", self.listener_failures);
        println!(
            "   └─ Pending at shutdown: {} ({})",
            self.pending,
            if self.persistent { "kept on disk" } else { "lost" }
        );

        println!("\n📈 {}", self.metrics);

        match self.dispatch {
            Some(ref summary) => {
                println!("🚚 Dispatcher");
                println!("   ├─ Passes: {}", summary.passes);
                println!("   ├─ Delivered: {}", summary.delivered);
                println!("   ├─ Requeued: {}", summary.requeued);
                println!("   ├─ Dropped: {}", summary.dropped);
                println!("   └─ Deferred: {}", summary.deferred);
            }
            None => println!("🚚 Dispatcher did not stop in time, totals unavailable"),
        }

        if !self.destinations.is_empty() {
            println!("\n🎯 Destinations");
            let last = self.destinations.len() - 1;
            for (i, (name, snapshot)) in self.destinations.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!(
                    "   {branch} {name}: sent={}, failed={}, outages={}, {}",
                    snapshot.sent,
                    snapshot.failed,
                    snapshot.outages,
                    if snapshot.healthy { "healthy" } else { "failing" }
                );
            }
        }

        if let Some(ref fatal) = self.fatal {
            println!("\n❌ {fatal}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let stats = RelayStats {
            duration: Duration::from_secs(4),
            metrics: MetricsSummary {
                inbound: 200,
                ..MetricsSummary::default()
            },
            ..RelayStats::default()
        };
        assert!((stats.rate() - 50.0).abs() < 1e-10);
        assert_eq!(RelayStats::default().rate(), 0.0);
    }
}
