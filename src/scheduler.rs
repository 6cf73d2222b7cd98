//! Drives rotation cycles, either once (cron mode) or on a fixed interval
//! alongside the metrics scrape server.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;
use crate::fastbound::FastboundClient;
use crate::rotation::{self, CycleOutcome};
use crate::server::{DownloaderMetrics, MetricsServer};

/// Delay between the scrape server coming up and the first cycle, so
/// scrapers see the process before any counter moves.
pub const STARTUP_GRACE: Duration = Duration::from_secs(5 * 60);

type ServerTask = JoinHandle<Result<()>>;

pub struct Scheduler {
    settings: Settings,
    client: FastboundClient,
    metrics: Arc<DownloaderMetrics>,
    interval: Duration,
    startup_grace: Duration,
}

impl Scheduler {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = FastboundClient::new(settings.api_base_url.clone())?;
        let metrics = Arc::new(DownloaderMetrics::new()?);
        let interval = settings.scanning_interval();

        Ok(Self {
            settings,
            client,
            metrics,
            interval,
            startup_grace: STARTUP_GRACE,
        })
    }

    /// Overrides the interval derived from `scanning-interval`.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_startup_grace(mut self, startup_grace: Duration) -> Self {
        self.startup_grace = startup_grace;
        self
    }

    pub fn metrics(&self) -> Arc<DownloaderMetrics> {
        self.metrics.clone()
    }

    /// Runs until the cron cycle completes or Ctrl-C is received.
    pub async fn run(self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, shutting down");
                signal_token.cancel();
            }
        });
        self.run_until(shutdown).await
    }

    /// Runs until the cron cycle completes or `shutdown` is cancelled.
    ///
    /// Cycle failures never end the run; only a metrics server that fails to
    /// bind, or dies while serving, is returned as an error.
    pub async fn run_until(self, shutdown: CancellationToken) -> Result<()> {
        // Independent of `shutdown`: the server stops only after the cycle loop has
        let server_shutdown = CancellationToken::new();
        let _server_guard = server_shutdown.clone().drop_guard();
        let mut server_task = None;

        if self.settings.metrics_enabled() {
            info!("Metrics server starting on {}", self.settings.metrics_port);
            let server = MetricsServer::bind_first(
                &self.settings.metrics_listen_addrs(),
                self.metrics.clone(),
            )
            .await?;
            server_task = Some(server.spawn(server_shutdown.clone()));

            if !self.startup_grace.is_zero() {
                info!("Waiting {:?} before scanning", self.startup_grace);
                tokio::select! {
                    _ = tokio::time::sleep(self.startup_grace) => {}
                    _ = shutdown.cancelled() => {
                        return stop_server(server_shutdown, server_task).await;
                    }
                    result = supervise(&mut server_task) => return result,
                }
            }
        }

        let result = if self.settings.is_cron {
            tokio::select! {
                _ = self.cycle() => Ok(()),
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, aborting in-flight cycle");
                    Ok(())
                }
            }
        } else {
            self.run_interval(&shutdown, &mut server_task).await
        };

        match result {
            Ok(()) => stop_server(server_shutdown, server_task).await,
            Err(e) => {
                server_shutdown.cancel();
                Err(e)
            }
        }
    }

    async fn run_interval(
        &self,
        shutdown: &CancellationToken,
        server_task: &mut Option<ServerTask>,
    ) -> Result<()> {
        info!("Scanning for new bound books every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        // An overrunning cycle is followed immediately by the next one
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.cancelled() => break,
                result = supervise(server_task) => return result,
            }

            tokio::select! {
                _ = self.cycle() => {}
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, aborting in-flight cycle");
                    break;
                }
                result = supervise(server_task) => return result,
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    async fn cycle(&self) -> CycleOutcome {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M %Z").to_string();
        info!("Running a cycle at {}", now);
        rotation::run_cycle(&self.client, &self.settings, &self.metrics).await
    }
}

/// Resolves only if the metrics server task ends, which is always an error
/// while cycles are still being scheduled.
async fn supervise(server_task: &mut Option<ServerTask>) -> Result<()> {
    let Some(handle) = server_task.as_mut() else {
        return std::future::pending().await;
    };
    let joined = handle.await;
    server_task.take();
    match joined {
        Ok(Ok(())) => bail!("Metrics server stopped unexpectedly"),
        Ok(Err(e)) => Err(e),
        Err(e) => Err(e.into()),
    }
}

async fn stop_server(
    server_shutdown: CancellationToken,
    server_task: Option<ServerTask>,
) -> Result<()> {
    server_shutdown.cancel();
    if let Some(handle) = server_task {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Metrics server exited with error: {:#}", e),
            Err(e) => warn!("Metrics server task failed: {}", e),
        }
    }
    Ok(())
}
