//! Configuration and application assembly for the Rolodex server binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::Router;
use rolodex_api::{AppState, AuthConfig};
use rolodex_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `ROLODEX_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  pub access_token_secret:    String,
  pub refresh_token_secret:   String,
  #[serde(default = "default_access_ttl")]
  pub access_token_ttl_secs:  i64,
  #[serde(default = "default_refresh_ttl")]
  pub refresh_token_ttl_secs: i64,
  #[serde(default = "default_secure_cookies")]
  pub secure_cookies:         bool,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("rolodex.db") }
fn default_access_ttl() -> i64 { 15 * 60 }
fn default_refresh_ttl() -> i64 { 7 * 24 * 60 * 60 }
fn default_secure_cookies() -> bool { true }

impl ServerConfig {
  /// Read `path` (if it exists) and then the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROLODEX"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn auth(&self) -> anyhow::Result<AuthConfig> {
    AuthConfig::new(
      &self.access_token_secret,
      &self.refresh_token_secret,
      self.access_token_ttl_secs,
      self.refresh_token_ttl_secs,
      self.secure_cookies,
    )
    .context("invalid token configuration")
  }
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

// ─── Application ──────────────────────────────────────────────────────────────

/// The full HTTP application: the API under `/api`, with request tracing.
pub fn app(store: SqliteStore, auth: AuthConfig) -> Router {
  Router::new()
    .nest("/api", rolodex_api::api_router(AppState::new(store, auth)))
    .layer(TraceLayer::new_for_http())
}
