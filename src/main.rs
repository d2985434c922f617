mod analytics;
mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod logging;
mod portal;
mod quarters;
mod sync;
mod ui;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::{CacheLayer, NoopStorage, SqliteStorage};
use crate::config::Config;
use crate::error::SyncError;
use crate::portal::client::PortalClient;
use crate::quarters::QuarterStore;
use crate::sync::SyncCoordinator;

#[derive(Parser, Debug)]
#[command(name = "attendr")]
#[command(about = "A terminal viewer for your attendance, with offline caching")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/attendr/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Attendance percentage to plan skips against
  #[arg(short, long)]
  min_percentage: Option<f64>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Show or edit quarter boundaries
  Quarters {
    #[command(subcommand)]
    action: QuarterAction,
  },
  /// Delete all cached attendance, then fetch from the portal again
  Reset {
    /// Confirm that local data may be deleted
    #[arg(long)]
    yes: bool,
  },
}

#[derive(Subcommand, Debug)]
enum QuarterAction {
  /// List quarters with their numbers
  List,
  /// Append a quarter; the start defaults to the day after the previous end
  Add {
    #[arg(long, value_parser = parse_cli_date)]
    start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_cli_date)]
    end: Option<NaiveDate>,
  },
  /// Remove quarter NUMBER (as shown by `list`)
  Remove { number: usize },
  /// Set where quarter NUMBER ends ("open" for no end)
  SetEnd { number: usize, end: String },
}

fn parse_cli_date(raw: &str) -> std::result::Result<NaiveDate, String> {
  analytics::parse_date(raw).ok_or_else(|| format!("expected DD/MM/YYYY or YYYY-MM-DD, got '{}'", raw))
}

/// 1-based quarter number from the CLI to an index
fn quarter_index(number: usize) -> Result<usize> {
  number
    .checked_sub(1)
    .ok_or_else(|| eyre!("Quarters are numbered from 1"))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override minimum if specified on command line
  if let Some(min) = args.min_percentage {
    if !(1.0..=100.0).contains(&min) {
      return Err(eyre!("--min-percentage must be between 1 and 100"));
    }
    config.attendance.min_percentage = min;
  }

  match args.command {
    Some(Commands::Quarters { action }) => run_quarters(&config, action),
    Some(Commands::Reset { yes }) => run_reset(&config, yes).await,
    None => run_tui(config).await,
  }
}

async fn run_tui(config: Config) -> Result<()> {
  let client = PortalClient::new(&config)?;
  let host = client.host().to_string();
  let sync = coordinator(&config, client);
  let quarter_store = QuarterStore::open(config.quarters_path()?);

  info!("Starting attendr for {}", host);
  let mut app = app::App::new(config, sync, host, quarter_store);
  app.run().await
}

async fn run_reset(config: &Config, yes: bool) -> Result<()> {
  if !yes {
    return Err(eyre!(
      "This deletes all cached attendance on this machine. Re-run with --yes to confirm."
    ));
  }

  let client = PortalClient::new(config)?;
  let mut sync = coordinator(config, client);

  match sync.full_reset().await {
    Ok(result) => {
      println!(
        "Cache cleared. Fetched {} records{}.",
        result.data.records.len(),
        if result.data.logged_in {
          ""
        } else {
          " (portal reports you are logged out)"
        }
      );
      Ok(())
    }
    Err(e) => Err(eyre!("Cache cleared, but fetching attendance failed: {}", e)),
  }
}

fn run_quarters(config: &Config, action: QuarterAction) -> Result<()> {
  let mut store = QuarterStore::open(config.quarters_path()?);

  match action {
    QuarterAction::List => {}
    QuarterAction::Add { start, end } => store.add(start, end)?,
    QuarterAction::Remove { number } => {
      let removed = store.remove(quarter_index(number)?)?;
      println!("Removed quarter {} ({})", number, removed);
    }
    QuarterAction::SetEnd { number, end } => {
      let end = match end.trim() {
        "open" | "" => None,
        raw => Some(parse_cli_date(raw).map_err(|e| eyre!(e))?),
      };
      store.set_end(quarter_index(number)?, end)?;
    }
  }

  let quarters = store.quarters();
  if quarters.is_empty() {
    println!("No quarters defined ({})", store.path().display());
  }
  for (i, quarter) in quarters.iter().enumerate() {
    println!("{:>2}. {}", i + 1, quarter);
  }
  Ok(())
}

fn coordinator(config: &Config, client: PortalClient) -> SyncCoordinator<PortalClient> {
  let cooldown = Duration::from_secs(config.sync.refresh_cooldown_secs);
  SyncCoordinator::new(client, open_cache(config), cooldown)
}

/// Persistent cache, or a pass-through when it is disabled or cannot open
fn open_cache(config: &Config) -> CacheLayer {
  if !config.cache.enabled {
    info!("Cache disabled, running network-only");
    return CacheLayer::new(NoopStorage);
  }

  match SqliteStorage::open(config.cache.path.as_deref()) {
    Ok(storage) => CacheLayer::new(storage),
    Err(e) => {
      warn!("{}, running network-only", SyncError::CacheUnavailable(e.to_string()));
      CacheLayer::new(NoopStorage)
    }
  }
}
