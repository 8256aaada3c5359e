//! rollcall server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), applies any
//! `ROLLCALL_*` environment overrides, opens an in-process SQLite store, and
//! serves the attendance API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use rollcall_core::Tracker;
use rollcall_server::{ServerConfig, expand_tilde};
use rollcall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "rollcall shift attendance server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let tracker = Tracker::with_system_clock(Arc::new(store))
    .with_default_tolerance(server_cfg.default_tolerance_minutes);
  let app = rollcall_server::app(tracker);

  let address = server_cfg.address();
  tracing::info!(
    store = %store_path.display(),
    default_tolerance = server_cfg.default_tolerance_minutes,
    "Listening on http://{address}"
  );
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
