//! Prometheus exposition over HTTP

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Running metrics endpoint
///
/// Stops when the shutdown token is cancelled.
pub struct MetricsServer {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl MetricsServer {
    /// Bind `addr` and serve `handle` at `path`
    #[instrument(name = "metrics_server_start", skip(handle, shutdown))]
    pub async fn start(
        handle: PrometheusHandle,
        addr: &str,
        path: &str,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let app = Router::new().route(path, get(move || std::future::ready(handle.render())));

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind metrics endpoint {addr}"))?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, path, "Metrics endpoint listening");

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = served {
                warn!(error = %e, "Metrics endpoint stopped with error");
            }
        });

        Ok(Self { local_addr, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the server task after the token was cancelled
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "Metrics endpoint task failed");
        }
    }
}
