use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fastbound_downloader::build_info;
use fastbound_downloader::config::{check_settings_file, load_settings, DEFAULT_SETTINGS_PATH};
use fastbound_downloader::Scheduler;

/// Makes a relative settings path absolute against the working directory.
/// The path is not required to exist yet; `check_settings_file` reports that.
fn resolve_settings_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Unable to read the working directory")?;
    Ok(cwd.join(path))
}

#[derive(Parser, Debug)]
#[clap(
    name = "fbdownloader",
    version,
    about = build_info::HELP_SHORT,
    long_about = build_info::HELP_LONG
)]
struct CliArgs {
    /// OPTIONAL: Specify an alternate settings file path.
    #[clap(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    pub settings_path: PathBuf,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tell you the version details.
    Version,
}

fn init_logging() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")
}

async fn run(cli_args: CliArgs) -> Result<()> {
    let settings_path = resolve_settings_path(&cli_args.settings_path)?;
    check_settings_file(&settings_path)?;
    let settings = load_settings(&settings_path)?;
    info!(
        "Loaded settings from {:?} (account {}, cron mode: {})",
        settings_path, settings.account_number, settings.is_cron
    );

    Scheduler::new(settings)?.run().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    if let Some(Command::Version) = cli_args.command {
        println!("{}", build_info::version_details());
        return Ok(());
    }

    init_logging()?;

    if let Err(e) = run(cli_args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
