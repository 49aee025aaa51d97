//! # Contracts
//!
//! Interface contracts shared by every relay crate: the record type, the
//! collaborator traits (listener, destination, queue, metrics recorder),
//! the relay configuration model and the unified error type.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Data flow
//! Listener -> fan-in channel -> ingestion bridge -> queue -> dispatch loop
//! -> destinations (requeue | drop)

mod config;
mod destination;
mod endpoint;
mod error;
mod listener;
mod metrics;
mod queue;
mod record;

pub use config::*;
pub use destination::{Destination, LocalDestination};
pub use endpoint::{InputEndpoint, OutputEndpoint};
pub use error::*;
pub use listener::{Listener, LocalListener, RecordSink};
pub use metrics::{MetricsRecorder, NoopMetrics};
pub use queue::{LocalRecordQueue, QueuedRecord, RecordQueue};
pub use record::Record;
