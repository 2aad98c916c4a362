//! rolodex-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and
//! `ROLODEX_*` environment variables, then serves the JSON API under `/api`.
//! The SQLite store is opened on the first request that needs it.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use rolodex_server::{ServerConfig, app, expand_tilde};
use rolodex_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rolodex contact manager server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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
  let server_cfg = ServerConfig::load(&cli.config)?;
  let auth = server_cfg.auth()?;

  let store_path = expand_tilde(&server_cfg.store_path);
  tracing::info!(path = %store_path.display(), "using contact store");
  let store = SqliteStore::new(store_path);

  let address = server_cfg.address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(store, auth))
    .await
    .context("server error")?;

  Ok(())
}
