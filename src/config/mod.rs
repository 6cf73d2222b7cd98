mod file_config;

pub use file_config::{FastboundConfig, FileConfig, PathsConfig};

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SETTINGS_PATH: &str = "/config/settings.json";
pub const DEFAULT_METRICS_PORT: &str = ":9090";
pub const DEFAULT_SCANNING_INTERVAL_MINUTES: u64 = 1440;
pub const DEFAULT_API_BASE_URL: &str = "https://cloud.fastbound.com";

const MIN_ACCOUNT_NUMBER_LEN: usize = 6;

/// Resolved, validated downloader settings. Immutable once loaded.
#[derive(Clone)]
pub struct Settings {
    pub account_number: String,
    pub api_key: String,
    pub audit_user: String,
    pub bound_books_path: PathBuf,
    pub background_checks_path: PathBuf,
    pub is_cron: bool,
    pub disable_metrics: bool,
    /// Listen address, always starting with `:` when no host is given (e.g. `:9090`).
    pub metrics_port: String,
    pub scanning_interval_minutes: u64,
    pub api_base_url: String,
}

// Hand-written so the API key never ends up in logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("account_number", &self.account_number)
            .field("api_key", &"<redacted>")
            .field("audit_user", &self.audit_user)
            .field("bound_books_path", &self.bound_books_path)
            .field("background_checks_path", &self.background_checks_path)
            .field("is_cron", &self.is_cron)
            .field("disable_metrics", &self.disable_metrics)
            .field("metrics_port", &self.metrics_port)
            .field("scanning_interval_minutes", &self.scanning_interval_minutes)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Settings {
    /// Applies defaults to a parsed settings document and validates it.
    pub fn resolve(file: FileConfig) -> Result<Self> {
        let account_number = file.fastbound.account_number.unwrap_or_default();
        let api_key = file.fastbound.api_key.unwrap_or_default();
        let audit_user = file.fastbound.audit_user.unwrap_or_default();
        let bound_books = file.paths.bound_books.unwrap_or_default();
        let background_checks = file.paths.background_checks.unwrap_or_default();

        if account_number.len() < MIN_ACCOUNT_NUMBER_LEN {
            bail!("fastbound account number appears to be in the wrong format");
        }
        if api_key.is_empty() {
            bail!("fastbound API key appears to be blank");
        }
        if bound_books.is_empty() {
            bail!("bound book path seems to be invalid");
        }
        if background_checks.is_empty() {
            bail!("4473s path seems to be invalid");
        }

        let metrics_port = normalize_metrics_port(file.metrics_port.as_deref().unwrap_or(""));

        let scanning_interval_minutes = match file.scanning_interval {
            None | Some(0) => DEFAULT_SCANNING_INTERVAL_MINUTES,
            Some(minutes) => minutes,
        };

        let api_base_url = file
            .api_base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            account_number,
            api_key,
            audit_user,
            bound_books_path: PathBuf::from(bound_books),
            background_checks_path: PathBuf::from(background_checks),
            is_cron: file.is_cron.unwrap_or(false),
            disable_metrics: file.disable_metrics.unwrap_or(false),
            metrics_port,
            scanning_interval_minutes,
            api_base_url,
        })
    }

    pub fn scanning_interval(&self) -> Duration {
        Duration::from_secs(self.scanning_interval_minutes.saturating_mul(60))
    }

    /// Whether the scrape server should be started for these settings.
    pub fn metrics_enabled(&self) -> bool {
        !self.is_cron && !self.disable_metrics
    }

    /// Socket addresses to try, in order, for the scrape server. An empty
    /// host part (`:9090`) means every interface: the IPv6 wildcard first,
    /// which is dual-stack on Linux, then IPv4 for hosts without IPv6.
    pub fn metrics_listen_addrs(&self) -> Vec<String> {
        match self.metrics_port.strip_prefix(':') {
            Some(port) => vec![format!("[::]:{}", port), format!("0.0.0.0:{}", port)],
            None => vec![self.metrics_port.clone()],
        }
    }
}

/// Defaults an empty port to `:9090` and makes sure the value starts with a colon.
pub fn normalize_metrics_port(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        DEFAULT_METRICS_PORT.to_string()
    } else if raw.starts_with(':') {
        raw.to_string()
    } else {
        format!(":{}", raw)
    }
}

/// Checks that the settings file exists and is readable by its owner only (mode `0400`).
pub fn check_settings_file(path: &Path) -> Result<()> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            bail!("Unable to find settings file {:?}: {}", path, e)
        }
        Err(e) => bail!("Unable to read settings file {:?}: {}", path, e),
    };

    if !metadata.is_file() {
        bail!("Settings file {:?} is not a regular file", path);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = metadata.permissions().mode() & 0o7777;
        if mode != 0o400 {
            bail!(
                "Settings file detected but mode is {:o}, not 0400!\n\
                 You SHOULD rotate any credentials in the file after fixing mode.",
                mode
            );
        }
    }

    Ok(())
}

/// Reads, defaults and validates the settings file at `path`.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let file = FileConfig::load(path)?;
    Settings::resolve(file).with_context(|| format!("Invalid settings in {:?}", path))
}
