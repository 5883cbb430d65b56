//! knot-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `KNOT_*`
//! environment variables, opens the SQLite store, and serves the JSON API.
//!
//! # Auditing a store
//!
//! To check every stored contact against the cluster invariants and exit:
//!
//! ```
//! cargo run -p knot-server -- --audit
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use knot_core::Reconciler;
use knot_server::{ServerConfig, expand_tilde};
use knot_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Knot identity reconciliation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Verify the store's link invariants and exit.
  #[arg(long)]
  audit: bool,
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

  let server_cfg = ServerConfig::load(&cli.config)
    .context("failed to load configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  if cli.audit {
    let checked = Reconciler::new(store)
      .audit()
      .await
      .context("store audit failed")?;
    tracing::info!(contacts = checked, "store audit passed");
    return Ok(());
  }

  let app = knot_server::router(store);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!("failed to listen for shutdown signal: {e}");
  }
  tracing::info!("Shutting down");
}
