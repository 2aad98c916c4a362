//! Password hashing, session cookies and the [`Authenticated`] extractor.

use std::sync::LazyLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{
    HeaderMap,
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    request::Parts,
  },
  response::AppendHeaders,
};
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use rolodex_core::store::UserStore;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  token::{TokenError, TokenKey, TokenKind},
};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Token keys and cookie policy for this server instance.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub access:         TokenKey,
  pub refresh:        TokenKey,
  /// Mark cookies `Secure`. Turn off only for plain-HTTP development.
  pub secure_cookies: bool,
}

impl AuthConfig {
  pub fn new(
    access_secret: &str,
    refresh_secret: &str,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    secure_cookies: bool,
  ) -> Result<Self, TokenError> {
    Ok(Self {
      access: TokenKey::new(
        TokenKind::Access,
        access_secret.as_bytes(),
        access_ttl_secs,
      )?,
      refresh: TokenKey::new(
        TokenKind::Refresh,
        refresh_secret.as_bytes(),
        refresh_ttl_secs,
      )?,
      secure_cookies,
    })
  }

  fn cookie(&self, name: &str, value: &str, max_age: i64) -> String {
    let secure = if self.secure_cookies { "; Secure" } else { "" };
    format!(
      "{name}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}{secure}"
    )
  }

  /// `Set-Cookie` values carrying a fresh access and refresh token.
  pub fn session_cookies(
    &self,
    user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<AppendHeaders<[(axum::http::HeaderName, String); 2]>, ApiError> {
    let access = self.access.issue(user_id, now).map_err(internal)?;
    let refresh = self.refresh.issue(user_id, now).map_err(internal)?;
    Ok(AppendHeaders([
      (
        SET_COOKIE,
        self.cookie(ACCESS_COOKIE, &access, self.access.ttl_secs()),
      ),
      (
        SET_COOKIE,
        self.cookie(REFRESH_COOKIE, &refresh, self.refresh.ttl_secs()),
      ),
    ]))
  }

  /// A `Set-Cookie` value carrying only a fresh access token.
  pub fn access_cookie(
    &self,
    user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<AppendHeaders<[(axum::http::HeaderName, String); 1]>, ApiError> {
    let access = self.access.issue(user_id, now).map_err(internal)?;
    Ok(AppendHeaders([(
      SET_COOKIE,
      self.cookie(ACCESS_COOKIE, &access, self.access.ttl_secs()),
    )]))
  }

  /// `Set-Cookie` values that expire both session cookies.
  pub fn cleared_cookies(
    &self,
  ) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
      (SET_COOKIE, self.cookie(ACCESS_COOKIE, "", 0)),
      (SET_COOKIE, self.cookie(REFRESH_COOKIE, "", 0)),
    ])
  }
}

fn internal(e: TokenError) -> ApiError { ApiError::Internal(Box::new(e)) }

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(e.to_string().into()))
}

/// Whether `password` matches the stored PHC string. An unparseable hash
/// never matches.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Verified against when no account matches the email, so both outcomes
/// cost one argon2 run.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
  hash_password("rolodex-no-such-account").unwrap_or_default()
});

/// Check a login attempt against the account's hash, or against a dummy hash
/// when there is no account. The latter never succeeds.
pub fn verify_login(password: &str, phc: Option<&str>) -> bool {
  match phc {
    Some(phc) => verify_password(password, phc),
    None => {
      let _ = verify_password(password, &DUMMY_HASH);
      false
    }
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get_all(COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v)
    .filter(|v| !v.is_empty())
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
}

/// Present in a handler's arguments means the request carried a valid access
/// token, either in the `access_token` cookie or as a bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated {
  pub user_id: Uuid,
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: UserStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = read_cookie(&parts.headers, ACCESS_COOKIE)
      .or_else(|| bearer(&parts.headers))
      .ok_or(ApiError::Unauthorized)?;

    let claims = state.auth.access.verify(token, Utc::now()).map_err(|e| {
      tracing::debug!(error = %e, "rejected access token");
      ApiError::Unauthorized
    })?;

    Ok(Authenticated {
      user_id: claims.sub,
    })
  }
}
