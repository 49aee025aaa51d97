//! Ingestion Pipeline main entry

use std::collections::HashMap;

use async_channel::{bounded, Receiver};
use contracts::{ContractError, Listener, Record, RecordSink};
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How one listener ended
#[derive(Debug)]
pub struct ListenerExit {
    /// Listener name
    pub name: String,
    /// `Err` when the listener failed (or its task panicked)
    pub result: Result<(), ContractError>,
}

/// Ingestion Pipeline
///
/// Owns the fan-in channel and one task per listener. Every listener shares
/// the same sending half; once [`close_sink`](Self::close_sink) has been
/// called the channel closes as soon as the last listener exits.
pub struct IngestionPipeline {
    tx: Option<RecordSink>,
    rx: Option<Receiver<Record>>,
    listeners: JoinSet<Result<(), ContractError>>,
    names: HashMap<Id, String>,
    shutdown: CancellationToken,
}

impl IngestionPipeline {
    /// Create a pipeline with a fan-in channel of `capacity` records
    pub fn new(capacity: usize, shutdown: CancellationToken) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        debug!(capacity, "fan-in channel created");

        Self {
            tx: Some(tx),
            rx: Some(rx),
            listeners: JoinSet::new(),
            names: HashMap::new(),
            shutdown,
        }
    }

    /// Spawn `listener` on its own task
    ///
    /// Returns `false` (and drops the listener) if the sink was already closed.
    #[instrument(
        name = "ingestion_spawn_listener",
        skip(self, listener),
        fields(listener = %listener.name())
    )]
    pub fn spawn_listener<L>(&mut self, mut listener: L) -> bool
    where
        L: Listener + 'static,
    {
        let Some(tx) = self.tx.clone() else {
            warn!("fan-in sink already closed, listener not started");
            return false;
        };
        let name = listener.name().to_string();
        let shutdown = self.shutdown.clone();

        let handle = self
            .listeners
            .spawn(async move { listener.listen(tx, shutdown).await });
        self.names.insert(handle.id(), name);
        true
    }

    /// Drop the pipeline's own sender
    ///
    /// Call once every listener has been spawned.
    pub fn close_sink(&mut self) {
        if self.tx.take().is_some() {
            debug!(listeners = self.listeners.len(), "fan-in sink sealed");
        }
    }

    /// Get data stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<Record>> {
        self.rx.take()
    }

    /// Listeners still running
    pub fn running(&self) -> usize {
        self.listeners.len()
    }

    /// Wait for the next listener to exit and log how it ended
    ///
    /// Returns `None` when no listener is left. Cancel safe.
    pub async fn next_exit(&mut self) -> Option<ListenerExit> {
        let joined = self.listeners.join_next_with_id().await?;
        let exit = match joined {
            Ok((id, result)) => ListenerExit {
                name: self.names.remove(&id).unwrap_or_default(),
                result,
            },
            Err(e) => {
                let name = self.names.remove(&e.id()).unwrap_or_default();
                let message = if e.is_panic() {
                    "listener task panicked"
                } else {
                    "listener task cancelled"
                };
                ListenerExit {
                    result: Err(ContractError::listener(&name, message)),
                    name,
                }
            }
        };

        match &exit.result {
            Ok(()) => info!(listener = %exit.name, "listener stopped"),
            Err(e) => warn!(listener = %exit.name, error = %e, "listener failed"),
        }
        Some(exit)
    }

    /// Wait until every listener has exited
    pub async fn join_all(&mut self) -> Vec<ListenerExit> {
        let mut exits = Vec::with_capacity(self.listeners.len());
        while let Some(exit) = self.next_exit().await {
            exits.push(exit);
        }
        exits
    }

    /// Cancel every listener and wait for them to exit
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub async fn stop_all(&mut self) -> Vec<ListenerExit> {
        info!(count = self.listeners.len(), "stopping all listeners");
        self.close_sink();
        self.shutdown.cancel();
        self.join_all().await
    }
}
