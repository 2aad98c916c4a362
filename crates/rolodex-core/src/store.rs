//! The `ContactStore` and `UserStore` traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `rolodex-store-sqlite`). The HTTP layer depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  contact::{Contact, NewContact},
  query::{ContactFilter, ContactQuery},
  user::{NewUser, User},
};

/// Classification a backend error must expose to the HTTP layer.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The write was rejected because the email is already taken.
  fn is_duplicate_email(&self) -> bool;
}

// ─── Contacts ────────────────────────────────────────────────────────────────

/// Abstraction over a contact store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ContactStore: Send + Sync {
  type Error: StoreError;

  /// Persist a new contact. The store assigns the id and both timestamps.
  ///
  /// Fails with a duplicate-email error if another contact has the same
  /// email; nothing is written in that case.
  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Retrieve a contact by id. Returns `None` if not found.
  fn get_contact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Overwrite the stored record with `contact.id`, refreshing `updated_at`.
  /// `created_at` is never changed. Returns `None` if no such contact exists.
  fn replace_contact(
    &self,
    contact: Contact,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Delete a contact. Returns `false` if it did not exist.
  fn delete_contact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Count every contact matching `filter`, ignoring any pagination.
  fn count_contacts<'a>(
    &'a self,
    filter: &'a ContactFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Fetch the sorted window of contacts matching `query`.
  fn find_contacts<'a>(
    &'a self,
    query: &'a ContactQuery,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + 'a;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

/// Account storage, sharing the contact store's backend and error type.
pub trait UserStore: ContactStore {
  /// Persist a new account. Fails with a duplicate-email error if the email
  /// is already registered.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Stamp a successful login. Returns the updated account, or `None` if it
  /// no longer exists.
  fn record_login(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;
}
