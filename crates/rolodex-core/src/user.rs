//! Account types consumed by the authentication flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  User,
  Admin,
}

/// A stored account. Deliberately not `Serialize`: it carries the password
/// hash. Use [`PublicUser`] for anything leaving the process.
#[derive(Debug, Clone)]
pub struct User {
  pub id:                Uuid,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             String,
  /// PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash:     String,
  pub role:              Role,
  pub is_email_verified: bool,
  pub last_login_at:     Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

/// Input to [`crate::store::UserStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         String,
  pub password_hash: String,
  pub role:          Role,
}

/// The sanitized view of an account returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
  pub id:                Uuid,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             String,
  pub role:              Role,
  pub is_email_verified: bool,
  pub last_login_at:     Option<DateTime<Utc>>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl From<User> for PublicUser {
  fn from(u: User) -> Self {
    PublicUser {
      id:                u.id,
      first_name:        u.first_name,
      last_name:         u.last_name,
      email:             u.email,
      role:              u.role,
      is_email_verified: u.is_email_verified,
      last_login_at:     u.last_login_at,
      created_at:        u.created_at,
      updated_at:        u.updated_at,
    }
  }
}
