//! Replay listener
//!
//! Feeds a fixed list of records, for tests and local dry runs without
//! network traffic.

use std::collections::VecDeque;
use std::time::Duration;

use contracts::{ContractError, Listener, Record, RecordSink};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What the listener does after its last record
#[derive(Debug, Clone)]
enum AfterReplay {
    Finish,
    WaitForShutdown,
    Fail(String),
}

/// Listener that replays preset records
#[derive(Debug, Clone)]
pub struct ReplayListener {
    name: String,
    records: VecDeque<Record>,
    interval: Option<Duration>,
    after: AfterReplay,
}

impl ReplayListener {
    /// Replay `records` then return
    pub fn new(name: impl Into<String>, records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            name: name.into(),
            records: records.into_iter().collect(),
            interval: None,
            after: AfterReplay::Finish,
        }
    }

    /// Pause between records
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Keep running after the last record until shutdown
    pub fn hold_open(mut self) -> Self {
        self.after = AfterReplay::WaitForShutdown;
        self
    }

    /// Fail with `message` after the last record
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.after = AfterReplay::Fail(message.into());
        self
    }
}

impl Listener for ReplayListener {
    fn name(&self) -> &str {
        &self.name
    }

    async fn listen(
        &mut self,
        sink: RecordSink,
        shutdown: CancellationToken,
    ) -> Result<(), ContractError> {
        while let Some(record) = self.records.pop_front() {
            if shutdown.is_cancelled() {
                return Ok(());
            }
            sink.send(record)
                .await
                .map_err(|_| ContractError::SinkClosed)?;
            if let Some(interval) = self.interval {
                tokio::select! {
                    _ = shutdown.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }
        debug!(listener = %self.name, "replay finished");

        match &self.after {
            AfterReplay::Finish => Ok(()),
            AfterReplay::WaitForShutdown => {
                shutdown.cancelled().await;
                Ok(())
            }
            AfterReplay::Fail(message) => Err(ContractError::listener(&self.name, message.clone())),
        }
    }
}
