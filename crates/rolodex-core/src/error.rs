//! Error types for `rolodex-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field was missing or a value failed validation.
  #[error("{0}")]
  Validation(String),

  #[error("invalid status: {0:?}")]
  UnknownStatus(String),

  #[error("invalid date for {param}: {value:?}")]
  InvalidDate { param: &'static str, value: String },

  #[error("unknown field: {0:?}")]
  UnknownField(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
