use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Response of `POST /{account}/api/Downloads/BoundBook`.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrlResponse {
    #[serde(default)]
    pub url: String,
}

/// Result of a successful bound book fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The document was downloaded and saved at this path.
    Downloaded(PathBuf),
    /// A document with the same name already existed at this path.
    Skipped(PathBuf),
}

impl DownloadOutcome {
    /// Path written during this cycle, `None` when the download was skipped.
    pub fn saved_path(&self) -> Option<&Path> {
        match self {
            DownloadOutcome::Downloaded(path) => Some(path),
            DownloadOutcome::Skipped(_) => None,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, DownloadOutcome::Skipped(_))
    }
}
