//! Ingestion bridge: fan-in channel -> queue

use std::sync::Arc;

use async_channel::Receiver;
use contracts::{MetricsRecorder, Record, RecordQueue};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::error::{IngestionError, Result};

/// Totals reported when the bridge exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeSummary {
    /// Records inserted into the queue
    pub forwarded: u64,
}

/// Moves records from the fan-in channel into the queue
///
/// Runs until the channel is closed and drained. A rejected insert is an
/// unrecoverable storage fault and ends the bridge with
/// [`IngestionError::Storage`].
pub struct IngestionBridge<Q> {
    rx: Receiver<Record>,
    queue: Arc<Q>,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<Q> IngestionBridge<Q>
where
    Q: RecordQueue + Send + Sync + 'static,
{
    pub fn new(rx: Receiver<Record>, queue: Arc<Q>, metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self { rx, queue, metrics }
    }

    /// Run until the fan-in channel closes
    #[instrument(name = "ingestion_bridge", skip(self))]
    pub async fn run(self) -> Result<BridgeSummary> {
        let mut summary = BridgeSummary::default();

        while let Ok(record) = self.rx.recv().await {
            self.metrics.inc_inbound();
            if let Err(e) = self.queue.put(record).await {
                error!(error = %e, forwarded = summary.forwarded, "queue insertion failed");
                return Err(IngestionError::Storage {
                    message: e.to_string(),
                });
            }
            summary.forwarded += 1;
        }

        info!(forwarded = summary.forwarded, "fan-in channel closed, bridge exiting");
        Ok(summary)
    }

    /// Run on a new task
    pub fn spawn(self) -> JoinHandle<Result<BridgeSummary>> {
        tokio::spawn(self.run())
    }
}
