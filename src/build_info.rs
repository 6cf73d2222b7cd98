pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("FBD_GIT_HASH");
pub const BUILD_TARGET: &str = env!("FBD_BUILD_TARGET");
pub const MAINTAINER: &str = "Route 1337 LLC";
pub const LICENSE: &str = "MIT";

pub const HELP_SHORT: &str = "An automated way to keep compliant Fastbound A&D book downloads";
pub const HELP_LONG: &str = "This tool is used to keep compliant automated downloads of
Fastbound A&D books locally using Docker/K8s vs the PowerShell script Fastbound provides.";

/// Text printed by the `version` subcommand.
pub fn version_details() -> String {
    format!(
        "{HELP_LONG}\n\nVersion: {VERSION}\nGit Hash: {GIT_HASH}\nBuild Arch: {}\nBuild Target: {BUILD_TARGET}\nMaintainer: {MAINTAINER}\nLicense: {LICENSE}",
        std::env::consts::ARCH
    )
}
