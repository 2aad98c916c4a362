//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rolodex_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  NotFound(String),

  /// Missing, invalid or expired token.
  #[error("Unauthorized")]
  Unauthorized,

  /// Unknown email or wrong password. The two are never told apart.
  #[error("Invalid credentials")]
  InvalidCredentials,

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: a unique-email violation is the client's
  /// fault, anything else is ours.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    if e.is_duplicate_email() {
      ApiError::BadRequest("Email already exists".into())
    } else {
      ApiError::Internal(Box::new(e))
    }
  }

  pub fn contact_not_found() -> Self {
    ApiError::NotFound("Contact not found".into())
  }
}

impl From<rolodex_core::Error> for ApiError {
  fn from(e: rolodex_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Unauthorized | ApiError::InvalidCredentials => {
        (StatusCode::UNAUTHORIZED, self.to_string())
      }
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "Internal Server Error".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
