//! Settings fixtures

use super::constants::*;
use fastbound_downloader::config::{FastboundConfig, FileConfig, PathsConfig, Settings};
use std::path::Path;

/// Settings for cron mode against `base_url`, storing books in `bound_books`.
pub fn test_settings(bound_books: &Path, base_url: &str) -> Settings {
    Settings::resolve(FileConfig {
        fastbound: FastboundConfig {
            account_number: Some(ACCOUNT_NUMBER.to_string()),
            api_key: Some(API_KEY.to_string()),
            audit_user: Some(AUDIT_USER.to_string()),
        },
        paths: PathsConfig {
            bound_books: Some(bound_books.to_string_lossy().to_string()),
            background_checks: Some(bound_books.to_string_lossy().to_string()),
        },
        is_cron: Some(true),
        api_base_url: Some(base_url.to_string()),
        ..Default::default()
    })
    .expect("test settings should be valid")
}

/// Writes `content` to `path` and applies `mode` to it.
#[cfg(unix)]
pub fn write_settings_file(path: &Path, content: &str, mode: u32) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, content).expect("Failed to write settings file");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .expect("Failed to set settings file mode");
}

/// Finds a port that is free right now on all interfaces.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("0.0.0.0:0")
        .expect("Failed to bind to random port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}
