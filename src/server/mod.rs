//! Scrape endpoint serving the downloader's Prometheus counters.

pub mod metrics;

pub use metrics::DownloaderMetrics;

use anyhow::{anyhow, Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub fn make_metrics_app(metrics: Arc<DownloaderMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics)
}

/// A bound but not yet serving metrics server.
///
/// Binding and serving are split so that a bind failure surfaces to the
/// caller before any background task is spawned.
pub struct MetricsServer {
    listener: TcpListener,
    app: Router,
}

impl MetricsServer {
    pub async fn bind(addr: &str, metrics: Arc<DownloaderMetrics>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind metrics server on {}", addr))?;
        Ok(Self {
            listener,
            app: make_metrics_app(metrics),
        })
    }

    /// Binds the first address in `addrs` that accepts a listener. The error
    /// from the last attempt is returned when none do.
    pub async fn bind_first(addrs: &[String], metrics: Arc<DownloaderMetrics>) -> Result<Self> {
        let mut last_err = None;
        for addr in addrs {
            match Self::bind(addr, metrics.clone()).await {
                Ok(server) => return Ok(server),
                Err(e) => {
                    debug!("{:#}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("No address to bind the metrics server on")))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves the scrape endpoint on a background task until `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            if let Ok(addr) = self.listener.local_addr() {
                info!("Metrics server listening on {}", addr);
            }
            axum::serve(self.listener, self.app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .context("Metrics server failed")
        })
    }
}
