//! # Dispatcher
//!
//! Outbound side of the relay.
//!
//! Responsibilities:
//! - Drain the queue in FIFO order (single consumer)
//! - Fan every record out to all destinations in configuration order
//! - Track per-destination health, logging each failure and recovery once
//! - Requeue (spillover) or drop incompletely delivered records
//!
//! A queue storage fault while requeueing is fatal and returned as
//! [`DispatcherError::Storage`]; destination failures never stop the loop.

pub mod destinations;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod health;
pub mod metrics;
pub mod slot;

#[cfg(test)]
mod testing;

pub use contracts::{Destination, Record};
pub use destinations::{
    build_destinations, AmqpDestination, LogDestination, OutputDestination, TcpDestination,
    UdpDestination,
};
pub use dispatcher::{
    create_dispatcher, DispatchPolicy, DispatchSummary, Dispatcher, DispatcherBuilder, PassOutcome,
};
pub use error::DispatcherError;
pub use fanout::{FanoutStrategy, LocalFanoutStrategy, SequentialFanout};
pub use health::{HealthTracker, HealthTransition};
pub use metrics::{DestinationSnapshot, DestinationStats};
pub use slot::DestinationSlot;
