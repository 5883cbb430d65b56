//! HTTP server assembly for Knot: configuration and the top-level router.
//!
//! The binary in `main.rs` wires these to a [`knot_store_sqlite::SqliteStore`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use knot_core::store::ContactStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `KNOT_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl ServerConfig {
  /// Load from `path` (optional) layered under the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(
      Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(Environment::with_prefix("KNOT")),
    )
  }

  fn from_builder(
    builder: ConfigBuilder<DefaultState>,
  ) -> Result<Self, ConfigError> {
    builder
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("store_path", "knot.db")?
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API routes plus `/healthz`, wrapped in an HTTP trace layer.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: ContactStore + 'static,
{
  knot_api::api_router(store)
    .route("/healthz", get(healthz))
    .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str { "ok" }
