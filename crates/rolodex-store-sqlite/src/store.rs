//! [`SqliteStore`]: the SQLite implementation of [`ContactStore`] and
//! [`UserStore`].

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, functions::FunctionFlags};
use tokio::sync::OnceCell;
use uuid::Uuid;

use rolodex_core::{
  contact::{Contact, NewContact},
  query::{ContactFilter, ContactQuery},
  store::{ContactStore, UserStore},
  user::{NewUser, User},
};

use crate::{
  Result,
  encode::{
    CONTACT_COLUMNS, ContactRow, RawContact, RawUser, USER_COLUMNS, encode_dt,
    encode_uuid, now,
  },
  error::unique_email,
  filter::{SqlFilter, count_sql, find_sql},
  schema::SCHEMA,
};

// ─── Connection target ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Location {
  File(PathBuf),
  Memory,
}

impl Location {
  async fn connect(&self) -> Result<tokio_rusqlite::Connection> {
    let conn = match self {
      Location::File(path) => tokio_rusqlite::Connection::open(path).await?,
      Location::Memory => tokio_rusqlite::Connection::open_in_memory().await?,
    };
    conn
      .call(|conn| {
        register_fold(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::info!(location = ?self, "opened contact store");
    Ok(conn)
  }
}

/// `fold(text)`: Unicode lowercasing, the same folding the in-memory filter
/// applies. SQLite's built-in `lower()` folds ASCII only.
fn register_fold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

struct Inner {
  location: Location,
  conn:     OnceCell<tokio_rusqlite::Connection>,
}

/// A Rolodex store backed by a single SQLite database.
///
/// The connection is opened on first use. Concurrent first uses wait on the
/// same attempt; a failed attempt leaves the handle unconnected so the next
/// call tries again. Cloning is cheap and clones share the connection.
#[derive(Clone)]
pub struct SqliteStore {
  inner: Arc<Inner>,
}

impl SqliteStore {
  fn with_location(location: Location) -> Self {
    Self {
      inner: Arc::new(Inner {
        location,
        conn: OnceCell::new(),
      }),
    }
  }

  /// A store for the database file at `path`. Nothing is opened until the
  /// first operation.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self::with_location(Location::File(path.into()))
  }

  /// A lazily-opened private in-memory store.
  pub fn in_memory() -> Self { Self::with_location(Location::Memory) }

  /// Open (or create) a store at `path` and run schema initialisation now.
  pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
    let store = Self::new(path);
    store.conn().await?;
    Ok(store)
  }

  /// Open an in-memory store now. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let store = Self::in_memory();
    store.conn().await?;
    Ok(store)
  }

  /// Whether the shared connection has been established.
  pub fn is_connected(&self) -> bool { self.inner.conn.initialized() }

  async fn conn(&self) -> Result<&tokio_rusqlite::Connection> {
    self
      .inner
      .conn
      .get_or_try_init(|| self.inner.location.connect())
      .await
  }

  async fn fetch_contact(&self, id_str: String) -> Result<Option<Contact>> {
    let raw: Option<RawContact> = self
      .conn()
      .await?
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts WHERE contact_id = ?1"
              ),
              rusqlite::params![id_str],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn fetch_user(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn()
      .await?
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
              rusqlite::params![value],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = crate::Error;

  async fn add_contact(&self, input: NewContact) -> Result<Contact> {
    let created_at = now();
    let contact = Contact {
      id: Uuid::new_v4(),
      first_name: input.first_name,
      last_name: input.last_name,
      email: input.email,
      phone: input.phone,
      company: input.company,
      job_title: input.job_title,
      tags: input.tags,
      address: input.address,
      social_media: input.social_media,
      notes: input.notes,
      status: input.status,
      source: input.source,
      last_contacted_date: input.last_contacted_date.map(|d| d.trunc_subsecs(6)),
      created_at,
      updated_at: created_at,
    };

    let row = ContactRow::encode(&contact)?;
    self
      .conn()
      .await?
      .call(move |conn| {
        row.insert(conn)?;
        Ok(())
      })
      .await
      .map_err(|e| unique_email(&contact.email, e))?;

    tracing::debug!(contact_id = %contact.id, "created contact");
    Ok(contact)
  }

  async fn get_contact(&self, id: Uuid) -> Result<Option<Contact>> {
    self.fetch_contact(encode_uuid(id)).await
  }

  async fn replace_contact(&self, contact: Contact) -> Result<Option<Contact>> {
    let mut contact = contact;
    contact.updated_at = now();
    contact.last_contacted_date =
      contact.last_contacted_date.map(|d| d.trunc_subsecs(6));

    let row = ContactRow::encode(&contact)?;
    let changed = self
      .conn()
      .await?
      .call(move |conn| Ok(row.update(conn)?))
      .await
      .map_err(|e| unique_email(&contact.email, e))?;

    if changed == 0 {
      return Ok(None);
    }
    // Re-read so the caller sees the stored `created_at`.
    self.fetch_contact(encode_uuid(contact.id)).await
  }

  async fn delete_contact(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let deleted = self
      .conn()
      .await?
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM contacts WHERE contact_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn count_contacts(&self, filter: &ContactFilter) -> Result<u64> {
    let SqlFilter { sql, params } = count_sql(filter);
    tracing::debug!(%sql, "counting contacts");

    let count: i64 = self
      .conn()
      .await?
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(params.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(u64::try_from(count).unwrap_or(0))
  }

  async fn find_contacts(&self, query: &ContactQuery) -> Result<Vec<Contact>> {
    let SqlFilter { sql, params } = find_sql(query);
    tracing::debug!(%sql, "finding contacts");

    let raws: Vec<RawContact> = self
      .conn()
      .await?
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(params.iter()),
            RawContact::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }
}

// ─── UserStore impl ──────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  async fn add_user(&self, input: NewUser) -> Result<User> {
    let created_at = now();
    let user = User {
      id: Uuid::new_v4(),
      first_name: input.first_name,
      last_name: input.last_name,
      email: input.email,
      password_hash: input.password_hash,
      role: input.role,
      is_email_verified: false,
      last_login_at: None,
      created_at,
      updated_at: created_at,
    };

    let id_str = encode_uuid(user.id);
    let first_name = user.first_name.clone();
    let last_name = user.last_name.clone();
    let email = user.email.clone();
    let hash = user.password_hash.clone();
    let role = user.role.as_ref().to_owned();
    let at_str = encode_dt(created_at);

    self
      .conn()
      .await?
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO users ({USER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?7)"
          ),
          rusqlite::params![
            id_str, first_name, last_name, email, hash, role, at_str
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| unique_email(&user.email, e))?;

    tracing::info!(user_id = %user.id, "registered account");
    Ok(user)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    self.fetch_user("email", email.to_owned()).await
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.fetch_user("user_id", encode_uuid(id)).await
  }

  async fn record_login(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<Option<User>> {
    let id_str = encode_uuid(id);
    let login_str = encode_dt(at.trunc_subsecs(6));
    let updated_str = encode_dt(now());

    let changed = self
      .conn()
      .await?
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET last_login_at = ?1, updated_at = ?2
           WHERE user_id = ?3",
          rusqlite::params![login_str, updated_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_user(id).await
  }
}
