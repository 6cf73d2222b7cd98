use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings document as it is laid out on disk.
///
/// Every field is optional here; defaults and validation are applied by
/// [`super::Settings::resolve`].
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    pub fastbound: FastboundConfig,
    pub paths: PathsConfig,
    pub is_cron: Option<bool>,
    pub disable_metrics: Option<bool>,
    pub metrics_port: Option<String>,
    #[serde(alias = "scanning-interval-minutes")]
    pub scanning_interval: Option<u64>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "kebab-case")]
pub struct FastboundConfig {
    pub account_number: Option<String>,
    pub api_key: Option<String>,
    pub audit_user: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, rename_all = "kebab-case")]
pub struct PathsConfig {
    pub bound_books: Option<String>,
    pub background_checks: Option<String>,
}

impl FileConfig {
    /// Reads and parses a settings document. Files ending in `.toml` are
    /// parsed as TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse settings file: {:?}", path))
        } else {
            Self::from_json_str(&content)
                .with_context(|| format!("Failed to parse settings file: {:?}", path))
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
