//! # Ingestion
//!
//! Inbound side of the relay.
//!
//! Responsibilities:
//! - Bind the configured listeners (UDP with chunk reassembly, TCP with
//!   zero-byte framing)
//! - Fan every listener into one bounded channel
//! - Move records from that channel into the queue ([`IngestionBridge`])
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionBridge, IngestionPipeline, InputListener};
//!
//! let mut pipeline = IngestionPipeline::new(config.fanin_capacity(), shutdown.clone());
//! for endpoint in &config.inputs {
//!     pipeline.spawn_listener(InputListener::bind(endpoint).await?);
//! }
//! let rx = pipeline.take_receiver().unwrap();
//! let bridge = IngestionBridge::new(rx, queue.clone(), metrics.clone()).spawn();
//! ```

mod bridge;
mod chunk;
mod error;
mod listeners;
mod pipeline;

pub use bridge::{BridgeSummary, IngestionBridge};
pub use chunk::{ChunkAssembler, ChunkError, CHUNK_EXPIRY, CHUNK_MAGIC, MAX_CHUNKS};
pub use contracts::Record;
pub use error::{IngestionError, Result};
pub use listeners::{InputListener, ReplayListener, TcpListener, UdpListener, MAX_DATAGRAM, MAX_FRAME_LEN};
pub use pipeline::{IngestionPipeline, ListenerExit};
