//! Error type for `rolodex-store-sqlite`.

use rolodex_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {kind} value: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  /// A unique index on `email` rejected the write.
  #[error("email already exists: {0}")]
  DuplicateEmail(String),
}

impl StoreError for Error {
  fn is_duplicate_email(&self) -> bool {
    matches!(self, Error::DuplicateEmail(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Map a failed write to [`Error::DuplicateEmail`] when SQLite reports a
/// UNIQUE constraint violation, and to [`Error::Database`] otherwise.
pub(crate) fn unique_email(email: &str, e: tokio_rusqlite::Error) -> Error {
  let is_unique = matches!(
    &e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  );
  if is_unique {
    Error::DuplicateEmail(email.to_owned())
  } else {
    Error::Database(e)
  }
}
