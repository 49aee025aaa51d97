//! Destination slot: one configured output plus its health state

use std::sync::Arc;

use contracts::Destination;

use crate::health::HealthTracker;
use crate::metrics::DestinationStats;

/// A destination at its configured position
pub struct DestinationSlot<D> {
    index: usize,
    destination: D,
    health: HealthTracker,
    stats: Arc<DestinationStats>,
}

impl<D: Destination> DestinationSlot<D> {
    pub fn new(index: usize, destination: D) -> Self {
        Self {
            index,
            destination,
            health: HealthTracker::new(),
            stats: Arc::new(DestinationStats::new()),
        }
    }

    /// Position in the configured output list
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        self.destination.name()
    }

    pub fn destination_mut(&mut self) -> &mut D {
        &mut self.destination
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut HealthTracker {
        &mut self.health
    }

    pub fn stats(&self) -> Arc<DestinationStats> {
        Arc::clone(&self.stats)
    }

    pub fn into_destination(self) -> D {
        self.destination
    }
}
