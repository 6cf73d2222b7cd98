//! HTTP client for the Fastbound bound book download API.

use anyhow::Result;
use futures::StreamExt;
use reqwest::{header::ACCEPT, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::models::{DownloadOutcome, SignedUrlResponse};
use crate::config::Settings;

/// Budget shared by the signing request and the download that follows it.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60);

/// Header the remote side uses for its audit log.
pub const AUDIT_USER_HEADER: &str = "X-AuditUser";

const ERROR_BODY_LIMIT: usize = 512;
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum FastboundError {
    #[error("Failed to execute {stage} request")]
    Request {
        stage: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("API request failed with status {status}: {body}")]
    SigningStatus { status: u16, body: String },

    #[error("Failed to decode JSON response")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("API response did not contain a download URL")]
    MissingUrl,

    #[error("Download URL is unusable ({reason}): {url}")]
    InvalidUrl { url: String, reason: String },

    #[error("File download failed with status {0}")]
    DownloadStatus(u16),

    #[error("Failed to save bound book file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bound book download did not complete within {0:?}")]
    DeadlineExceeded(Duration),
}

impl FastboundError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        FastboundError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Client for the two-step bound book download: a signing POST that
/// returns a pre-signed URL, then an anonymous GET of that URL.
#[derive(Clone)]
pub struct FastboundClient {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
}

impl FastboundClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Fastbound API (e.g., "https://cloud.fastbound.com")
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            deadline: DEFAULT_DEADLINE,
        })
    }

    /// Overrides the combined POST + GET budget.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn bound_book_url(&self, account_number: &str) -> String {
        format!(
            "{}/{}/api/Downloads/BoundBook",
            self.base_url, account_number
        )
    }

    /// Fetch the latest bound book into `settings.bound_books_path`.
    ///
    /// Skips the download when a file with the signed URL's name already
    /// exists there. The whole exchange is bounded by the client deadline.
    pub async fn download_bound_book(
        &self,
        settings: &Settings,
    ) -> Result<DownloadOutcome, FastboundError> {
        match tokio::time::timeout(self.deadline, self.fetch_bound_book(settings)).await {
            Ok(result) => result,
            Err(_) => Err(FastboundError::DeadlineExceeded(self.deadline)),
        }
    }

    async fn fetch_bound_book(
        &self,
        settings: &Settings,
    ) -> Result<DownloadOutcome, FastboundError> {
        let signed_url = self.request_signed_url(settings).await?;

        let file_name = file_name_from_url(&signed_url)?;
        let destination = settings.bound_books_path.join(&file_name);

        let exists = tokio::fs::try_exists(&destination)
            .await
            .map_err(|e| FastboundError::io(&destination, e))?;
        if exists {
            debug!("Bound book {:?} already present, skipping", destination);
            return Ok(DownloadOutcome::Skipped(destination));
        }

        self.download_to(&signed_url, &destination).await?;
        Ok(DownloadOutcome::Downloaded(destination))
    }

    async fn request_signed_url(&self, settings: &Settings) -> Result<String, FastboundError> {
        let api_url = self.bound_book_url(&settings.account_number);
        let response = self
            .client
            .post(&api_url)
            .basic_auth(&settings.api_key, Some(&settings.api_key))
            .header(ACCEPT, "application/json")
            .header(AUDIT_USER_HEADER, settings.audit_user.as_str())
            .send()
            .await
            .map_err(|source| FastboundError::Request {
                stage: "POST",
                source,
            })?;

        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FastboundError::SigningStatus {
                status,
                body: truncate_body(&body),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FastboundError::Request {
                stage: "POST",
                source,
            })?;
        let signed: SignedUrlResponse =
            serde_json::from_slice(&body).map_err(FastboundError::InvalidResponse)?;

        if signed.url.is_empty() {
            return Err(FastboundError::MissingUrl);
        }
        Ok(signed.url)
    }

    async fn download_to(&self, url: &str, destination: &Path) -> Result<(), FastboundError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FastboundError::Request {
                stage: "GET",
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(FastboundError::DownloadStatus(response.status().as_u16()));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FastboundError::io(parent, e))?;
        }

        let mut partial = PartialFile::create(destination).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FastboundError::Request {
                stage: "GET",
                source,
            })?;
            partial.write_all(&chunk).await?;
        }
        partial.commit().await
    }
}

/// Derives the local file name from the last path segment of a signed URL.
/// The query string never contributes to the name.
pub fn file_name_from_url(raw: &str) -> Result<String, FastboundError> {
    // Signatures live in the query string and stay out of error messages
    let invalid = |reason: &str| FastboundError::InvalidUrl {
        url: raw.split('?').next().unwrap_or_default().to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    let segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or("");
    let name = urlencoding::decode(segment).map_err(|e| invalid(&e.to_string()))?;

    if name.is_empty() || name == "." || name == ".." {
        return Err(invalid("no file name in path"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("file name contains a path separator"));
    }
    Ok(name.into_owned())
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Download target written next to its final path and renamed into place
/// only once complete. Dropping it uncommitted removes the partial file.
struct PartialFile {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl PartialFile {
    async fn create(final_path: &Path) -> Result<Self, FastboundError> {
        let mut temp_name = final_path.as_os_str().to_owned();
        temp_name.push(PARTIAL_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        let file = File::create(&temp_path)
            .await
            .map_err(|e| FastboundError::io(&temp_path, e))?;

        Ok(Self {
            file: Some(file),
            temp_path,
            final_path: final_path.to_path_buf(),
            committed: false,
        })
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), FastboundError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        file.write_all(data)
            .await
            .map_err(|e| FastboundError::io(&self.temp_path, e))
    }

    async fn commit(mut self) -> Result<(), FastboundError> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| FastboundError::io(&self.temp_path, e))?;
            file.sync_all()
                .await
                .map_err(|e| FastboundError::io(&self.temp_path, e))?;
        }
        tokio::fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| FastboundError::io(&self.final_path, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove partial download {:?}: {}",
                    self.temp_path, e
                );
            }
        }
    }
}
