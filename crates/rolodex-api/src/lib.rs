//! JSON REST API for Rolodex.
//!
//! Exposes an axum [`Router`] backed by any [`rolodex_core::store::UserStore`].
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rolodex_api::api_router(state))
//! ```

pub mod auth;
pub mod contacts;
pub mod error;
pub mod session;
pub mod token;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rolodex_core::store::UserStore;

pub use auth::{AuthConfig, Authenticated};
pub use error::ApiError;

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: S, auth: AuthConfig) -> Self {
    Self {
      store: Arc::new(store),
      auth:  Arc::new(auth),
    }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: UserStore + Clone + 'static,
{
  Router::new()
    // Contacts
    .route(
      "/contacts",
      get(contacts::list::<S>).post(contacts::create::<S>),
    )
    .route(
      "/contacts/{id}",
      get(contacts::get_one::<S>)
        .put(contacts::update::<S>)
        .delete(contacts::delete_one::<S>),
    )
    // Session
    .route("/auth/register", post(session::register::<S>))
    .route("/auth/login", post(session::login::<S>))
    .route("/auth/logout", post(session::logout::<S>))
    .route("/auth/refresh", post(session::refresh::<S>))
    .route("/auth/me", get(session::me::<S>))
    .with_state(state)
}
