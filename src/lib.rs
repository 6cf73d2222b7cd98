//! Fastbound Downloader Library
//!
//! Periodically fetches the latest A&D bound book from the Fastbound API and
//! keeps a local copy, exposing success/skip/failure counters for scraping.

pub mod build_info;
pub mod config;
pub mod fastbound;
pub mod rotation;
pub mod scheduler;
pub mod server;

pub use config::{check_settings_file, load_settings, Settings};
pub use fastbound::{DownloadOutcome, FastboundClient, FastboundError};
pub use rotation::{run_cycle, CycleOutcome};
pub use scheduler::Scheduler;
pub use server::DownloaderMetrics;
