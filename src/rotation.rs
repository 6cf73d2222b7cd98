//! One rotation cycle: fetch the latest bound book and account for the outcome.

use std::path::PathBuf;
use tracing::{error, info};

use crate::config::Settings;
use crate::fastbound::{DownloadOutcome, FastboundClient};
use crate::server::DownloaderMetrics;

/// What happened during a single cycle. Exactly one counter moves per outcome.
#[derive(Debug)]
pub enum CycleOutcome {
    Downloaded(PathBuf),
    Skipped(PathBuf),
    Failed(String),
}

impl CycleOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }
}

/// Runs one download cycle. Failures are logged and counted, never returned
/// as errors, so the caller can keep scheduling cycles.
pub async fn run_cycle(
    client: &FastboundClient,
    settings: &Settings,
    metrics: &DownloaderMetrics,
) -> CycleOutcome {
    info!(
        "Downloading the latest bound book for account {}",
        settings.account_number
    );

    match client.download_bound_book(settings).await {
        Ok(DownloadOutcome::Downloaded(path)) => {
            metrics.record_downloaded();
            info!("Downloaded the bound book {}", path.display());
            CycleOutcome::Downloaded(path)
        }
        Ok(DownloadOutcome::Skipped(path)) => {
            metrics.record_skipped();
            info!(
                "Bound book {} was already downloaded, skipping",
                path.display()
            );
            CycleOutcome::Skipped(path)
        }
        Err(e) => {
            metrics.record_failed();
            let reason = format!("{:#}", anyhow::Error::from(e));
            error!("Failed to download the bound book: {}", reason);
            CycleOutcome::Failed(reason)
        }
    }
}
