use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use prerelease_watch::config::{self, TrackerConfig};
use prerelease_watch::host::updater::{UpdateTransient, check_for_updates, plugin_info};
use prerelease_watch::logging;
use prerelease_watch::release::artifact::SystemClock;
use prerelease_watch::release::cache::SqliteStore;
use prerelease_watch::release::engine::UpdateEngine;
use prerelease_watch::release::fetchers::GitHubFetcher;
use prerelease_watch::release::types::InstalledComponent;

#[derive(Parser)]
#[command(name = "prerelease-watch")]
#[command(version, about = "Offers beta and release-candidate builds published on GitHub as updates")]
struct Cli {
    /// Config file (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ignore cached artifacts and query the API
    #[arg(long, global = true)]
    force: bool,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the log file as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge an available pre-release into the update transient
    Check {
        #[arg(long)]
        installed_version: String,

        /// Prior transient as JSON (empty when omitted)
        #[arg(long)]
        transient: Option<PathBuf>,
    },
    /// Print the details record for the update dialog
    Info {
        #[arg(long)]
        installed_version: String,

        #[arg(long, default_value = "")]
        author: String,

        #[arg(long, default_value = "")]
        homepage: String,

        /// Slug requested by the host (defaults to the configured one)
        #[arg(long)]
        slug: Option<String>,
    },
    /// Manage cached release artifacts
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached artifact
    Clear,
    /// Remove expired artifacts only
    Purge,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(&config::log_path(), cli.verbose, cli.log_json)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.force)?;
    let engine = open_engine(config)?;

    match cli.command {
        Command::Check {
            installed_version,
            transient,
        } => {
            let mut prior = match transient {
                Some(path) => read_transient(&path)?,
                None => UpdateTransient::default(),
            };
            prior.checked = Some(Utc::now());

            let installed = InstalledComponent::new(installed_version);
            let transient = check_for_updates(&engine, prior, &installed).await;
            println!("{}", serde_json::to_string_pretty(&transient)?);
        }
        Command::Info {
            installed_version,
            author,
            homepage,
            slug,
        } => {
            let slug = slug.unwrap_or_else(|| engine.config().slug.clone());
            let installed = InstalledComponent {
                version: installed_version,
                author,
                homepage,
            };
            let info = plugin_info(&engine, &slug, &installed).await;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Cache { action } => {
            let removed = match action {
                CacheAction::Clear => engine.cache().clear()?,
                CacheAction::Purge => engine.cache().purge_expired()?,
            };
            info!("Removed {} cached artifacts", removed);
            println!("Removed {} cached artifacts", removed);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, force: bool) -> anyhow::Result<TrackerConfig> {
    let mut config = match path {
        Some(path) => TrackerConfig::load(path)?,
        None => {
            let path = config::default_config_path();
            if path.exists() {
                TrackerConfig::load(&path)?
            } else {
                debug!("No config at {:?}, using defaults", path);
                TrackerConfig::default().with_env_overrides()
            }
        }
    };

    if force {
        config.force_update = true;
    }

    Ok(config)
}

fn open_engine(config: TrackerConfig) -> anyhow::Result<UpdateEngine<SqliteStore>> {
    let db_path = config::db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }

    let store = Arc::new(SqliteStore::open(&db_path)?);
    let fetcher = Arc::new(GitHubFetcher::new(&config.api_url)?);

    Ok(UpdateEngine::new(
        config,
        fetcher,
        store,
        Arc::new(SystemClock),
    )?)
}

fn read_transient(path: &Path) -> anyhow::Result<UpdateTransient> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transient {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse transient {:?}", path))
}
