//! Dispatcher - drains the queue and fans every record out to the destinations

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contracts::{
    ContractError, Destination, MetricsRecorder, QueuedRecord, RecordQueue, RelayConfig,
};

use crate::destinations::{build_destinations, OutputDestination};
use crate::error::DispatcherError;
use crate::fanout::{FanoutStrategy, SequentialFanout};
use crate::health::HealthTransition;
use crate::metrics::DestinationStats;
use crate::slot::DestinationSlot;

/// What happens to incompletely delivered records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Requeue at the tail instead of dropping
    pub spillover: bool,
    /// Echo every record to the log before dispatch
    pub verbose: bool,
}

impl DispatchPolicy {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            spillover: config.spillover(),
            verbose: config.verbose,
        }
    }
}

/// Fate of one record after its delivery pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every destination accepted it
    Delivered,
    /// Put back at the tail for another pass
    Requeued,
    /// Discarded (spillover disabled)
    Dropped,
    /// Queue closed before it could be requeued; left where it was
    Deferred,
}

/// Totals reported when the dispatcher stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub passes: u64,
    pub delivered: u64,
    pub requeued: u64,
    pub dropped: u64,
    pub deferred: u64,
}

impl DispatchSummary {
    fn record(&mut self, outcome: PassOutcome) {
        self.passes += 1;
        match outcome {
            PassOutcome::Delivered => self.delivered += 1,
            PassOutcome::Requeued => self.requeued += 1,
            PassOutcome::Dropped => self.dropped += 1,
            PassOutcome::Deferred => self.deferred += 1,
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<D, Q, F = SequentialFanout> {
    destinations: Vec<D>,
    queue: Arc<Q>,
    metrics: Arc<dyn MetricsRecorder>,
    policy: DispatchPolicy,
    fanout: F,
}

impl<D, Q> DispatcherBuilder<D, Q>
where
    D: Destination,
    Q: RecordQueue + Send + Sync + 'static,
{
    pub fn new(queue: Arc<Q>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            destinations: Vec::new(),
            queue,
            metrics,
            policy: DispatchPolicy::default(),
            fanout: SequentialFanout,
        }
    }
}

impl<D, Q, F> DispatcherBuilder<D, Q, F>
where
    D: Destination,
    Q: RecordQueue + Send + Sync + 'static,
    F: FanoutStrategy + Sync,
{
    /// Append a destination (delivery order is insertion order)
    pub fn destination(mut self, destination: D) -> Self {
        self.destinations.push(destination);
        self
    }

    pub fn destinations(mut self, destinations: impl IntoIterator<Item = D>) -> Self {
        self.destinations.extend(destinations);
        self
    }

    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the fan-out strategy
    pub fn fanout<G: FanoutStrategy + Sync>(self, fanout: G) -> DispatcherBuilder<D, Q, G> {
        DispatcherBuilder {
            destinations: self.destinations,
            queue: self.queue,
            metrics: self.metrics,
            policy: self.policy,
            fanout,
        }
    }

    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(destinations = self.destinations.len(), spillover = self.policy.spillover)
    )]
    pub fn build(self) -> Dispatcher<D, Q, F> {
        let slots = self
            .destinations
            .into_iter()
            .enumerate()
            .map(|(index, destination)| DestinationSlot::new(index, destination))
            .collect();

        Dispatcher {
            slots,
            queue: self.queue,
            metrics: self.metrics,
            policy: self.policy,
            fanout: self.fanout,
        }
    }
}

/// The dispatch loop
///
/// Single consumer of the queue. Each record gets one delivery pass over all
/// destinations; the record leaves the queue only after the pass (and after
/// any requeue insert) completed.
pub struct Dispatcher<D, Q, F = SequentialFanout> {
    slots: Vec<DestinationSlot<D>>,
    queue: Arc<Q>,
    metrics: Arc<dyn MetricsRecorder>,
    policy: DispatchPolicy,
    fanout: F,
}

impl<D, Q, F> Dispatcher<D, Q, F>
where
    D: Destination + 'static,
    Q: RecordQueue + Send + Sync + 'static,
    F: FanoutStrategy + Sync + 'static,
{
    /// Per-destination counters, in configuration order
    pub fn stats(&self) -> Vec<(String, Arc<DestinationStats>)> {
        self.slots
            .iter()
            .map(|slot| (slot.name().to_string(), slot.stats()))
            .collect()
    }

    /// Run until the queue is closed
    ///
    /// Destinations are closed before returning. The only error is a queue
    /// storage fault while requeueing or releasing a record.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Result<DispatchSummary, DispatcherError> {
        info!(
            destinations = self.slots.len(),
            spillover = self.policy.spillover,
            "Dispatcher started"
        );

        let mut summary = DispatchSummary::default();
        let outcome = loop {
            let queued = match self.queue.next().await {
                Ok(Some(queued)) => queued,
                Ok(None) => break Ok(()),
                Err(e) => {
                    warn!(error = %e, "queue consumption failed, treating as closed");
                    break Ok(());
                }
            };

            match self.dispatch_pass(queued).await {
                Ok(PassOutcome::Requeued) => {
                    summary.record(PassOutcome::Requeued);
                    // retries never wait on the queue, let other tasks run
                    tokio::task::yield_now().await;
                }
                Ok(pass) => summary.record(pass),
                Err(e) => break Err(e),
            }

            if summary.passes % 1000 == 0 {
                debug!(
                    passes = summary.passes,
                    delivered = summary.delivered,
                    pending = self.queue.len(),
                    "Dispatcher progress"
                );
            }
        };

        info!(
            passes = summary.passes,
            delivered = summary.delivered,
            requeued = summary.requeued,
            dropped = summary.dropped,
            "Dispatcher queue closed, shutting down"
        );

        Self::close_destinations(self.slots).await;
        outcome.map(|()| summary)
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Result<DispatchSummary, DispatcherError>> {
        tokio::spawn(self.run())
    }

    async fn dispatch_pass(&mut self, queued: QueuedRecord) -> Result<PassOutcome, DispatcherError> {
        let started = Instant::now();
        let QueuedRecord { seq, record } = queued;

        if self.policy.verbose {
            info!(seq, record = %record.to_lossy_str(), "dispatching record");
        }

        let results = self.fanout.deliver(&mut self.slots, &record).await;
        let mut complete = true;
        for (slot, result) in self.slots.iter_mut().zip(results) {
            complete &= apply_send_result(slot, result, self.metrics.as_ref());
        }

        let outcome = if complete {
            self.metrics.inc_outbound();
            PassOutcome::Delivered
        } else if self.policy.spillover {
            match self.queue.put(record).await {
                Ok(()) => {
                    self.metrics.inc_requeued();
                    PassOutcome::Requeued
                }
                Err(ContractError::QueueClosed) => {
                    warn!(seq, "queue closed before requeue, record left in place");
                    PassOutcome::Deferred
                }
                Err(e) => return Err(DispatcherError::storage(e.to_string())),
            }
        } else {
            self.metrics.inc_dropped();
            debug!(seq, "record incompletely delivered, dropped");
            PassOutcome::Dropped
        };

        if outcome != PassOutcome::Deferred {
            self.queue
                .remove(seq)
                .map_err(|e| DispatcherError::storage(e.to_string()))?;
        }

        self.metrics.observe_latency(started.elapsed());
        Ok(outcome)
    }

    async fn close_destinations(slots: Vec<DestinationSlot<D>>) {
        for slot in slots {
            let index = slot.index();
            let mut destination = slot.into_destination();
            if let Err(e) = destination.close().await {
                debug!(destination = %destination.name(), index, error = %e, "close failed");
            }
        }
    }
}

/// Apply one send result to the slot's health and counters
///
/// Returns whether the send succeeded. Failure and recovery are logged and
/// counted once per transition.
fn apply_send_result<D: Destination>(
    slot: &mut DestinationSlot<D>,
    result: Result<(), ContractError>,
    metrics: &dyn MetricsRecorder,
) -> bool {
    let stats = slot.stats();
    match result {
        Ok(()) => {
            if slot.health_mut().record_success() == HealthTransition::Recovered {
                info!(
                    destination = %slot.name(),
                    index = slot.index(),
                    "destination is alive again"
                );
                stats.set_healthy(true);
            }
            stats.inc_sent();
            metrics.inc_delivery(slot.name());
            true
        }
        Err(e) => {
            stats.inc_failed();
            if slot.health_mut().record_failure(&e) == HealthTransition::Failed {
                warn!(
                    destination = %slot.name(),
                    index = slot.index(),
                    error = %e,
                    "destination failed"
                );
                stats.inc_outages();
                stats.set_healthy(false);
                metrics.inc_error(slot.name());
            }
            false
        }
    }
}

/// Convenience function to create the production dispatcher from config
#[instrument(name = "dispatcher_create", skip_all, fields(outputs = config.outputs.len()))]
pub fn create_dispatcher<Q>(
    config: &RelayConfig,
    queue: Arc<Q>,
    metrics: Arc<dyn MetricsRecorder>,
) -> Dispatcher<OutputDestination, Q>
where
    Q: RecordQueue + Send + Sync + 'static,
{
    DispatcherBuilder::new(queue, metrics)
        .destinations(build_destinations(&config.outputs, config.send_timeout()))
        .policy(DispatchPolicy::from_config(config))
        .build()
}
