//! # Spool
//!
//! Record queues backing the relay.
//!
//! - [`MemoryQueue`]: process-local FIFO, lost on restart
//! - [`DiskQueue`]: sled-backed FIFO, survives restart
//! - [`SpoolQueue`]: picks one of the two from the configured data dir
//!
//! Both hand out the head record with `next` and only forget it on `remove`,
//! so the dispatch loop decides when a record has really left the relay.

mod disk;
mod error;
mod memory;
mod selection;

pub use contracts::{QueuedRecord, Record, RecordQueue};
pub use disk::DiskQueue;
pub use error::SpoolError;
pub use memory::MemoryQueue;
pub use selection::SpoolQueue;
