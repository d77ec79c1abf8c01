//! shelfwatch binary.
//!
//! Reads `shelfwatch.toml` (or the path given with `--config`), opens the
//! SQLite store, and runs one reconciliation cycle. Meant to be invoked
//! repeatedly by an external scheduler (cron, systemd timer, ...).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use shelfwatch_core::{item::ItemRecord, store::CatalogStore};
use shelfwatch_monitor::{HttpProvider, Monitor, MonitorConfig};
use shelfwatch_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Store availability monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "shelfwatch.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run one full reconciliation cycle (the default).
  Run,
  /// Add an item to the catalog; it is probed on the next run.
  Add {
    id:          i64,
    package_key: String,
  },
  /// Remove duplicate entries from the change log and exit.
  Dedup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SHELFWATCH").separator("__"))
    .build()
    .context("failed to read config file")?;

  let monitor_cfg: MonitorConfig = settings
    .try_deserialize()
    .context("failed to deserialise MonitorConfig")?;
  monitor_cfg.validate()?;

  let store_path = expand_tilde(&monitor_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Run) {
    Command::Add { id, package_key } => {
      store
        .append_item(ItemRecord::new(id, package_key.trim()))
        .await
        .with_context(|| format!("failed to add item {id}"))?;
      tracing::info!(id, "item added to catalog");
    }
    Command::Dedup => {
      let monitor = build_monitor(store, &monitor_cfg)?;
      let removed = monitor.deduplicate().await?;
      tracing::info!(removed, "change log deduplicated");
    }
    Command::Run => {
      let monitor = build_monitor(store, &monitor_cfg)?;
      let today = chrono::Utc::now().date_naive();
      monitor.run_cycle(today).await.context("cycle failed")?;
    }
  }

  Ok(())
}

fn build_monitor(
  store: SqliteStore,
  cfg: &MonitorConfig,
) -> anyhow::Result<Monitor<SqliteStore, SqliteStore, SqliteStore, HttpProvider>> {
  let provider = HttpProvider::new(cfg.provider.clone())?;
  Ok(Monitor::new(store.clone(), store.clone(), store, provider, &cfg.policy))
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
