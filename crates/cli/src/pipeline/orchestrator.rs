//! Relay orchestrator - wires listeners, queue and dispatcher together.
//!
//! Startup order: metrics endpoint, queue, dispatcher, fan-in channel and
//! bridge, listeners. Shutdown runs the other way round once any listener
//! set is exhausted, the token is cancelled or a fatal fault occurs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{RecordQueue, RelayConfig};
use dispatcher::{DispatchSummary, DispatcherError};
use ingestion::{BridgeSummary, IngestionBridge, IngestionPipeline, InputListener};
use observability::{MetricsServer, RelayMetrics};
use spool::SpoolQueue;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::RelayStats;
use crate::error::CliError;

/// How long the dispatcher may keep running after the queue is closed
const DISPATCH_GRACE: Duration = Duration::from_secs(5);

/// What ended the wait phase
enum Trigger {
    ListenersDone,
    Shutdown,
    Bridge(Result<ingestion::Result<BridgeSummary>, JoinError>),
    Dispatcher(Result<Result<DispatchSummary, DispatcherError>, JoinError>),
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run the relay to completion
    ///
    /// Returns `Err` only when startup fails before any record can flow.
    /// Faults after that end the run and are reported in
    /// [`RelayStats::fatal`].
    pub async fn run(self, shutdown: CancellationToken) -> Result<RelayStats> {
        let start_time = Instant::now();
        let config = &self.config;
        // stops the metrics endpoint and listeners on every exit path
        let _cancel_on_exit = shutdown.clone().drop_guard();

        let metrics = Arc::new(RelayMetrics::new());
        let metrics_server = if config.metrics.enabled {
            let handle = observability::install_prometheus()?;
            let server = MetricsServer::start(
                handle,
                &config.metrics.listen_addr,
                &config.metrics.path,
                shutdown.clone(),
            )
            .await?;
            Some(server)
        } else {
            None
        };

        let queue =
            SpoolQueue::open(config.data_dir.as_deref()).context("Failed to open queue")?;
        let persistent = queue.is_persistent();
        let queue = Arc::new(queue);
        info!(
            persistent,
            backlog = queue.len(),
            spillover = config.spillover(),
            "Queue opened"
        );

        let dispatcher = dispatcher::create_dispatcher(config, queue.clone(), metrics.clone());
        let destination_stats = dispatcher.stats();
        let mut dispatcher_handle = dispatcher.spawn();
        info!(destinations = destination_stats.len(), "Dispatcher started");

        let mut ingestion = IngestionPipeline::new(config.fanin_capacity(), shutdown.clone());
        let rx = ingestion
            .take_receiver()
            .context("Failed to get fan-in receiver")?;
        let mut bridge_handle = IngestionBridge::new(rx, queue.clone(), metrics.clone()).spawn();

        let mut fatal = None;
        for endpoint in &config.inputs {
            match InputListener::bind(endpoint).await {
                Ok(listener) => {
                    ingestion.spawn_listener(listener);
                }
                Err(e) => {
                    error!(%endpoint, error = %e, "Listener failed to start");
                    fatal = Some(CliError::startup(endpoint.to_string(), e));
                    break;
                }
            }
        }
        ingestion.close_sink();
        info!(listeners = ingestion.running(), "Relay running");

        let mut listener_failures = 0;
        let trigger = if fatal.is_some() {
            Trigger::Shutdown
        } else {
            loop {
                tokio::select! {
                    exit = ingestion.next_exit() => match exit {
                        Some(exit) => {
                            if exit.result.is_err() {
                                listener_failures += 1;
                            }
                        }
                        None => break Trigger::ListenersDone,
                    },
                    _ = shutdown.cancelled() => break Trigger::Shutdown,
                    joined = &mut bridge_handle => break Trigger::Bridge(joined),
                    joined = &mut dispatcher_handle => break Trigger::Dispatcher(joined),
                }
            }
        };

        match trigger {
            Trigger::ListenersDone => info!("All listeners exited"),
            Trigger::Shutdown => info!("Shutdown requested"),
            Trigger::Bridge(_) => warn!("Ingestion bridge exited"),
            Trigger::Dispatcher(_) => warn!("Dispatcher exited"),
        }
        info!("Shutting down relay...");
        shutdown.cancel();

        listener_failures += ingestion
            .stop_all()
            .await
            .iter()
            .filter(|exit| exit.result.is_err())
            .count();

        let (bridge_joined, dispatcher_joined) = match trigger {
            Trigger::Bridge(joined) => (joined, None),
            Trigger::Dispatcher(joined) => (bridge_handle.await, Some(joined)),
            Trigger::ListenersDone | Trigger::Shutdown => (bridge_handle.await, None),
        };

        let forwarded = match flatten_join(bridge_joined) {
            Ok(summary) => summary.forwarded,
            Err(message) => {
                error!(error = %message, "Ingestion bridge failed");
                fatal.get_or_insert(CliError::fatal("ingestion bridge", message));
                0
            }
        };

        if let Err(e) = queue.close() {
            error!(error = %e, "Queue close failed");
            fatal.get_or_insert(CliError::fatal("queue", e));
        }

        let dispatcher_joined = match dispatcher_joined {
            Some(joined) => Some(joined),
            None => match tokio::time::timeout(DISPATCH_GRACE, &mut dispatcher_handle).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    warn!(
                        grace_secs = DISPATCH_GRACE.as_secs(),
                        "Dispatcher did not stop in time, abandoning it"
                    );
                    dispatcher_handle.abort();
                    None
                }
            },
        };

        let dispatch = match dispatcher_joined.map(flatten_join) {
            Some(Ok(summary)) => Some(summary),
            Some(Err(message)) => {
                error!(error = %message, "Dispatcher failed");
                fatal.get_or_insert(CliError::fatal("dispatcher", message));
                None
            }
            None => None,
        };

        if let Some(server) = metrics_server {
            server.join().await;
        }

        let stats = RelayStats {
            duration: start_time.elapsed(),
            forwarded,
            dispatch,
            metrics: metrics.summary(),
            destinations: destination_stats
                .iter()
                .map(|(name, stats)| (name.clone(), stats.snapshot()))
                .collect(),
            listener_failures,
            pending: queue.len(),
            persistent,
            fatal,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            pending = stats.pending,
            failed = stats.fatal.is_some(),
            "Relay shutdown complete"
        );
        Ok(stats)
    }
}

/// Collapse a task's join result and its own result into one message
fn flatten_join<T, E: std::fmt::Display>(joined: Result<Result<T, E>, JoinError>) -> Result<T, String> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("task panicked or was cancelled: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{InputEndpoint, OutputEndpoint};
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn free_tcp_addr() -> String {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        probe.local_addr().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_relay_tcp_to_log_until_cancelled() {
        let addr = free_tcp_addr().await;
        let config = RelayConfig {
            inputs: vec![InputEndpoint::Tcp(addr.clone())],
            outputs: vec![OutputEndpoint::Log],
            ..RelayConfig::default()
        };

        let shutdown = CancellationToken::new();
        let relay = tokio::spawn(Relay::new(config).run(shutdown.clone()));

        let mut stream = loop {
            match TcpStream::connect(&addr).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        };
        stream
            .write_all(b"{\"short_message\":\"a\"}\0{\"short_message\":\"b\"}\0")
            .await
            .unwrap();
        stream.flush().await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.cancel();

        let stats = relay.await.unwrap().unwrap();
        assert!(stats.fatal.is_none());
        assert_eq!(stats.metrics.inbound, 2);
        assert_eq!(stats.metrics.outbound, 2);
        assert_eq!(stats.destinations[0].0, "log://");
        assert_eq!(stats.destinations[0].1.sent, 2);
        assert!(!stats.persistent);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = RelayConfig {
            inputs: vec![InputEndpoint::Tcp(taken.local_addr().unwrap().to_string())],
            outputs: vec![OutputEndpoint::Log],
            ..RelayConfig::default()
        };

        let stats = Relay::new(config)
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert!(matches!(stats.fatal, Some(CliError::Startup { .. })));
        assert_eq!(stats.forwarded, 0);
    }
}
