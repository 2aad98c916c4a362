//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
//! suffix) so that text comparison orders them chronologically. Tags are
//! stored as a compact JSON array. UUIDs are stored as hyphenated lowercase
//! strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use rolodex_core::{
  contact::{Address, Contact, ContactStatus, SocialMedia},
  user::{Role, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<ContactStatus> {
  s.parse().map_err(|_| Error::UnknownVariant {
    kind:  "status",
    value: s.to_owned(),
  })
}

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::UnknownVariant {
    kind:  "role",
    value: s.to_owned(),
  })
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[String]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Contacts ────────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawContact::from_row`].
pub const CONTACT_COLUMNS: &str = "contact_id, first_name, last_name, email, \
  phone, company, job_title, tags, address_street, address_city, \
  address_state, address_country, address_zip_code, social_linkedin, \
  social_twitter, social_facebook, notes, status, source, \
  last_contacted_date, created_at, updated_at";

/// A contact flattened into column values, ready to bind.
pub struct ContactRow {
  pub contact_id:          String,
  pub first_name:          String,
  pub last_name:           String,
  pub email:               String,
  pub phone:               Option<String>,
  pub company:             Option<String>,
  pub job_title:           Option<String>,
  pub tags:                String,
  pub address_street:      Option<String>,
  pub address_city:        Option<String>,
  pub address_state:       Option<String>,
  pub address_country:     Option<String>,
  pub address_zip_code:    Option<String>,
  pub social_linkedin:     Option<String>,
  pub social_twitter:      Option<String>,
  pub social_facebook:     Option<String>,
  pub notes:               Option<String>,
  pub status:              String,
  pub source:              Option<String>,
  pub last_contacted_date: Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
}

impl ContactRow {
  pub fn encode(c: &Contact) -> Result<Self> {
    Ok(Self {
      contact_id:          encode_uuid(c.id),
      first_name:          c.first_name.clone(),
      last_name:           c.last_name.clone(),
      email:               c.email.clone(),
      phone:               c.phone.clone(),
      company:             c.company.clone(),
      job_title:           c.job_title.clone(),
      tags:                encode_tags(&c.tags)?,
      address_street:      c.address.street.clone(),
      address_city:        c.address.city.clone(),
      address_state:       c.address.state.clone(),
      address_country:     c.address.country.clone(),
      address_zip_code:    c.address.zip_code.clone(),
      social_linkedin:     c.social_media.linkedin.clone(),
      social_twitter:      c.social_media.twitter.clone(),
      social_facebook:     c.social_media.facebook.clone(),
      notes:               c.notes.clone(),
      status:              c.status.as_ref().to_owned(),
      source:              c.source.clone(),
      last_contacted_date: c.last_contacted_date.map(encode_dt),
      created_at:          encode_dt(c.created_at),
      updated_at:          encode_dt(c.updated_at),
    })
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute(
      &format!(
        "INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (
           :contact_id, :first_name, :last_name, :email, :phone, :company,
           :job_title, :tags, :address_street, :address_city, :address_state,
           :address_country, :address_zip_code, :social_linkedin,
           :social_twitter, :social_facebook, :notes, :status, :source,
           :last_contacted_date, :created_at, :updated_at
         )"
      ),
      rusqlite::named_params! {
        ":contact_id":          self.contact_id,
        ":first_name":          self.first_name,
        ":last_name":           self.last_name,
        ":email":               self.email,
        ":phone":               self.phone,
        ":company":             self.company,
        ":job_title":           self.job_title,
        ":tags":                self.tags,
        ":address_street":      self.address_street,
        ":address_city":        self.address_city,
        ":address_state":       self.address_state,
        ":address_country":     self.address_country,
        ":address_zip_code":    self.address_zip_code,
        ":social_linkedin":     self.social_linkedin,
        ":social_twitter":      self.social_twitter,
        ":social_facebook":     self.social_facebook,
        ":notes":               self.notes,
        ":status":              self.status,
        ":source":              self.source,
        ":last_contacted_date": self.last_contacted_date,
        ":created_at":          self.created_at,
        ":updated_at":          self.updated_at,
      },
    )
  }

  /// Overwrite every mutable column. `created_at` is left as stored.
  pub fn update(&self, conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "UPDATE contacts SET
         first_name = :first_name, last_name = :last_name, email = :email,
         phone = :phone, company = :company, job_title = :job_title,
         tags = :tags, address_street = :address_street,
         address_city = :address_city, address_state = :address_state,
         address_country = :address_country,
         address_zip_code = :address_zip_code,
         social_linkedin = :social_linkedin, social_twitter = :social_twitter,
         social_facebook = :social_facebook, notes = :notes,
         status = :status, source = :source,
         last_contacted_date = :last_contacted_date,
         updated_at = :updated_at
       WHERE contact_id = :contact_id",
      rusqlite::named_params! {
        ":contact_id":          self.contact_id,
        ":first_name":          self.first_name,
        ":last_name":           self.last_name,
        ":email":               self.email,
        ":phone":               self.phone,
        ":company":             self.company,
        ":job_title":           self.job_title,
        ":tags":                self.tags,
        ":address_street":      self.address_street,
        ":address_city":        self.address_city,
        ":address_state":       self.address_state,
        ":address_country":     self.address_country,
        ":address_zip_code":    self.address_zip_code,
        ":social_linkedin":     self.social_linkedin,
        ":social_twitter":      self.social_twitter,
        ":social_facebook":     self.social_facebook,
        ":notes":               self.notes,
        ":status":              self.status,
        ":source":              self.source,
        ":last_contacted_date": self.last_contacted_date,
        ":updated_at":          self.updated_at,
      },
    )
  }
}

/// Raw strings read directly from a `contacts` row.
pub struct RawContact(ContactRow);

impl RawContact {
  /// Read a row selected with [`CONTACT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self(ContactRow {
      contact_id:          row.get(0)?,
      first_name:          row.get(1)?,
      last_name:           row.get(2)?,
      email:               row.get(3)?,
      phone:               row.get(4)?,
      company:             row.get(5)?,
      job_title:           row.get(6)?,
      tags:                row.get(7)?,
      address_street:      row.get(8)?,
      address_city:        row.get(9)?,
      address_state:       row.get(10)?,
      address_country:     row.get(11)?,
      address_zip_code:    row.get(12)?,
      social_linkedin:     row.get(13)?,
      social_twitter:      row.get(14)?,
      social_facebook:     row.get(15)?,
      notes:               row.get(16)?,
      status:              row.get(17)?,
      source:              row.get(18)?,
      last_contacted_date: row.get(19)?,
      created_at:          row.get(20)?,
      updated_at:          row.get(21)?,
    }))
  }

  pub fn into_contact(self) -> Result<Contact> {
    let r = self.0;
    Ok(Contact {
      id:                  decode_uuid(&r.contact_id)?,
      first_name:          r.first_name,
      last_name:           r.last_name,
      email:               r.email,
      phone:               r.phone,
      company:             r.company,
      job_title:           r.job_title,
      tags:                decode_tags(&r.tags)?,
      address:             Address {
        street:   r.address_street,
        city:     r.address_city,
        state:    r.address_state,
        country:  r.address_country,
        zip_code: r.address_zip_code,
      },
      social_media:        SocialMedia {
        linkedin: r.social_linkedin,
        twitter:  r.social_twitter,
        facebook: r.social_facebook,
      },
      notes:               r.notes,
      status:              decode_status(&r.status)?,
      source:              r.source,
      last_contacted_date: decode_opt_dt(r.last_contacted_date)?,
      created_at:          decode_dt(&r.created_at)?,
      updated_at:          decode_dt(&r.updated_at)?,
    })
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawUser::from_row`].
pub const USER_COLUMNS: &str = "user_id, first_name, last_name, email, \
  password_hash, role, is_email_verified, last_login_at, created_at, \
  updated_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:           String,
  pub first_name:        String,
  pub last_name:         String,
  pub email:             String,
  pub password_hash:     String,
  pub role:              String,
  pub is_email_verified: bool,
  pub last_login_at:     Option<String>,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:           row.get(0)?,
      first_name:        row.get(1)?,
      last_name:         row.get(2)?,
      email:             row.get(3)?,
      password_hash:     row.get(4)?,
      role:              row.get(5)?,
      is_email_verified: row.get(6)?,
      last_login_at:     row.get(7)?,
      created_at:        row.get(8)?,
      updated_at:        row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:                decode_uuid(&self.user_id)?,
      first_name:        self.first_name,
      last_name:         self.last_name,
      email:             self.email,
      password_hash:     self.password_hash,
      role:              decode_role(&self.role)?,
      is_email_verified: self.is_email_verified,
      last_login_at:     decode_opt_dt(self.last_login_at)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}
