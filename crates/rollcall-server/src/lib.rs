//! HTTP server assembly for rollcall.
//!
//! Holds the runtime [`ServerConfig`] and wires a [`Tracker`] into the
//! [`rollcall_api`] router with request tracing.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::Router;
use rollcall_core::{
  Tracker, shift::DEFAULT_TOLERANCE_MINUTES, store::AttendanceStore, time::Clock,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Prefix for environment overrides, e.g. `ROLLCALL_PORT=9000`.
pub const ENV_PREFIX: &str = "ROLLCALL";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  pub store_path:                PathBuf,
  /// Tolerance given to new shifts that do not specify one.
  pub default_tolerance_minutes: u32,
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` and `ROLLCALL_*` variables over
  /// the built-in defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080_i64)?
      .set_default("store_path", "rollcall.db")?
      .set_default(
        "default_tolerance_minutes",
        i64::from(DEFAULT_TOLERANCE_MINUTES),
      )?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with an HTTP trace layer on top.
pub fn app<S, C>(tracker: Tracker<S, C>) -> Router
where
  S: AttendanceStore + 'static,
  C: Clock + Clone + 'static,
{
  rollcall_api::api_router(tracker).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::{io::Write as _, sync::Arc};

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use rollcall_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn defaults_apply_without_a_file() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/rollcall.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.default_tolerance_minutes, 15);
    assert_eq!(cfg.address(), "127.0.0.1:8080");
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = std::env::temp_dir().join(format!("rollcall-cfg-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "port = 9123\ndefault_tolerance_minutes = 5").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.port, 9123);
    assert_eq!(cfg.default_tolerance_minutes, 5);
    assert_eq!(cfg.host, "127.0.0.1");

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn tilde_is_expanded_only_as_a_prefix() {
    let plain = Path::new("/var/lib/rollcall.db");
    assert_eq!(expand_tilde(plain), plain);

    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/rollcall.db")),
        PathBuf::from(home).join("rollcall.db")
      );
    }
  }

  #[tokio::test]
  async fn app_serves_the_api() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let tracker = Tracker::with_system_clock(Arc::new(store));
    let resp = app(tracker)
      .oneshot(Request::get("/shifts").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let shifts: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(shifts, serde_json::json!([]));
  }
}
