use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metric name prefix for all downloader metrics
const PREFIX: &str = "fastbound_downloader";

/// Counters describing the outcome of every rotation cycle.
///
/// The counters live in their own registry rather than the process-wide
/// default one, so the scrape endpoint only exposes what this crate owns.
pub struct DownloaderMetrics {
    registry: Registry,
    downloaded_books_total: IntCounter,
    skipped_book_downloads_total: IntCounter,
    failed_book_downloads_total: IntCounter,
}

impl DownloaderMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let downloaded_books_total = IntCounter::with_opts(Opts::new(
            format!("{PREFIX}_downloaded_books_total"),
            "The total number of successful bound book downloads",
        ))
        .context("Failed to create downloaded_books_total metric")?;

        let skipped_book_downloads_total = IntCounter::with_opts(Opts::new(
            format!("{PREFIX}_skipped_book_downloads_total"),
            "The total number of times the found book was already detected as downloaded",
        ))
        .context("Failed to create skipped_book_downloads_total metric")?;

        let failed_book_downloads_total = IntCounter::with_opts(Opts::new(
            format!("{PREFIX}_failed_book_downloads_total"),
            "The total number of failed attempts at downloading a bound book",
        ))
        .context("Failed to create failed_book_downloads_total metric")?;

        registry.register(Box::new(downloaded_books_total.clone()))?;
        registry.register(Box::new(skipped_book_downloads_total.clone()))?;
        registry.register(Box::new(failed_book_downloads_total.clone()))?;

        tracing::debug!("Metrics registry initialized");

        Ok(Self {
            registry,
            downloaded_books_total,
            skipped_book_downloads_total,
            failed_book_downloads_total,
        })
    }

    pub fn record_downloaded(&self) {
        self.downloaded_books_total.inc();
    }

    pub fn record_skipped(&self) {
        self.skipped_book_downloads_total.inc();
    }

    pub fn record_failed(&self) {
        self.failed_book_downloads_total.inc();
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded_books_total.get()
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_book_downloads_total.get()
    }

    pub fn failed(&self) -> u64 {
        self.failed_book_downloads_total.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = vec![];
        encoder
            .encode(&metric_families, &mut buffer)
            .context("Failed to encode metrics")?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(metrics): State<Arc<DownloaderMetrics>>) -> impl IntoResponse {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
