//! Client for the Fastbound compliance API.

pub mod client;
pub mod models;

pub use client::{file_name_from_url, FastboundClient, FastboundError, DEFAULT_DEADLINE};
pub use models::{DownloadOutcome, SignedUrlResponse};
