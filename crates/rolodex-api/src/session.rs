//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: `{firstName, lastName, email, password}`; 201 + cookies |
//! | `POST` | `/auth/login`    | Body: `{email, password}`; 401 `Invalid credentials` on any mismatch |
//! | `POST` | `/auth/logout`   | Expires both cookies |
//! | `POST` | `/auth/refresh`  | Trades the `refresh_token` cookie for a new access token |
//! | `GET`  | `/auth/me`       | The account behind the access token |

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use chrono::Utc;
use rolodex_core::{
  store::UserStore,
  user::{NewUser, PublicUser, Role},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
  AppState,
  auth::{
    Authenticated, REFRESH_COOKIE, hash_password, read_cookie, verify_login,
  },
  error::ApiError,
};

/// Response body carrying the sanitized account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBody {
  pub user: PublicUser,
}

fn required(name: &str, value: &str) -> Result<String, ApiError> {
  let value = value.trim();
  if value.is_empty() {
    return Err(ApiError::BadRequest(format!("{name} is required")));
  }
  Ok(value.to_owned())
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterBody {
  pub first_name: String,
  pub last_name:  String,
  pub email:      String,
  pub password:   String,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let Json(body) = body?;
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password is required".into()));
  }
  let input = NewUser {
    first_name:    required("firstName", &body.first_name)?,
    last_name:     required("lastName", &body.last_name)?,
    email:         required("email", &body.email)?.to_ascii_lowercase(),
    password_hash: hash_password(&body.password)?,
    role:          Role::User,
  };

  let user = state
    .store
    .add_user(input)
    .await
    .map_err(ApiError::from_store)?;
  let cookies = state.auth.session_cookies(user.id, Utc::now())?;
  Ok((
    StatusCode::CREATED,
    cookies,
    Json(UserBody { user: user.into() }),
  ))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let Json(body) = body?;
  let email = body.email.trim().to_ascii_lowercase();

  let user = state
    .store
    .find_user_by_email(&email)
    .await
    .map_err(ApiError::from_store)?;
  let verified = verify_login(
    &body.password,
    user.as_ref().map(|u| u.password_hash.as_str()),
  );
  let Some(user) = user.filter(|_| verified) else {
    tracing::warn!("rejected login");
    return Err(ApiError::InvalidCredentials);
  };

  let now = Utc::now();
  let user = state
    .store
    .record_login(user.id, now)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::InvalidCredentials)?;
  tracing::info!(user_id = %user.id, "logged in");

  let cookies = state.auth.session_cookies(user.id, now)?;
  Ok((cookies, Json(UserBody { user: user.into() })))
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
  S: UserStore + Clone + 'static,
{
  (
    state.auth.cleared_cookies(),
    Json(json!({ "message": "Logged out successfully" })),
  )
}

// ─── Refresh ──────────────────────────────────────────────────────────────────

/// `POST /auth/refresh`
pub async fn refresh<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let token =
    read_cookie(&headers, REFRESH_COOKIE).ok_or(ApiError::Unauthorized)?;
  let now = Utc::now();
  let claims = state.auth.refresh.verify(token, now).map_err(|e| {
    tracing::debug!(error = %e, "rejected refresh token");
    ApiError::Unauthorized
  })?;

  let user = state
    .store
    .get_user(claims.sub)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Unauthorized)?;

  let cookie = state.auth.access_cookie(user.id, now)?;
  Ok((cookie, Json(UserBody { user: user.into() })))
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me<S>(
  auth: Authenticated,
  State(state): State<AppState<S>>,
) -> Result<Json<UserBody>, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let user = state
    .store
    .get_user(auth.user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Unauthorized)?;
  Ok(Json(UserBody { user: user.into() }))
}
