use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use site_monitor::config::AppConfig;
use site_monitor::engine::run_once;
use site_monitor::factory;
use site_monitor::notify::EmailNotifier;
use site_monitor::probe::HttpProber;
use site_monitor::store::{KeyValueStore, RecipientBook, StatusStore, TomlFileStore};
use site_monitor::utils;

/// Check every listed site once and email recipients about status changes.
#[derive(Debug, Parser)]
#[command(name = "site-monitor", version, about)]
struct Cli {
    /// Config file; also stores site status and recipient mappings
    #[arg(short, long, env = "SITE_MONITOR_CONFIG", default_value = "monitor.toml")]
    config: PathBuf,

    /// Site list to use instead of `lists.sites_path`
    #[arg(short, long)]
    sites: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    utils::setup_console();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let _log_guard = utils::init_logging(&config.settings)?;
    info!("Main program started");

    let backing: Arc<dyn KeyValueStore> = Arc::new(TomlFileStore::new(&cli.config));
    let statuses = StatusStore::new(backing.clone());
    let recipients = RecipientBook::new(backing, config.email.default_recipient.clone());

    let sites_path = cli.sites.unwrap_or_else(|| config.lists.sites_path.clone());
    let sites = factory::read_sites(&sites_path)?;
    let mut monitors = factory::build_monitors(sites, &statuses, &recipients)?;

    let prober = HttpProber::new(config.settings.probe_timeout())
        .context("Failed to build HTTP client")?;
    let notifier = EmailNotifier::smtp(&config.email).context("Failed to set up email")?;

    run_once(
        &mut monitors,
        &config.settings.sentinel_url,
        &prober,
        &notifier,
        &statuses,
    )
    .await;

    Ok(())
}
