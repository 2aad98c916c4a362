//! Contact types, the sole persisted entity of the contact manager.
//!
//! A [`Contact`] is created from a [`NewContact`], mutated in place by a
//! [`ContactPatch`] and deleted outright. There is no soft-delete and no
//! version history.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a contact sits in the relationship pipeline.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContactStatus {
  Active,
  Inactive,
  #[default]
  Lead,
  Customer,
  Prospect,
}

// ─── Sub-records ─────────────────────────────────────────────────────────────

/// A postal address. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
  pub street:   Option<String>,
  pub city:     Option<String>,
  pub state:    Option<String>,
  pub country:  Option<String>,
  pub zip_code: Option<String>,
}

/// Links to the contact's social-media profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialMedia {
  pub linkedin: Option<String>,
  pub twitter:  Option<String>,
  pub facebook: Option<String>,
}

/// A named part of [`Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum AddressField {
  Street,
  City,
  State,
  Country,
  ZipCode,
}

/// A named part of [`SocialMedia`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum SocialField {
  Linkedin,
  Twitter,
  Facebook,
}

impl Address {
  pub fn field(&self, field: AddressField) -> Option<&str> {
    match field {
      AddressField::Street => self.street.as_deref(),
      AddressField::City => self.city.as_deref(),
      AddressField::State => self.state.as_deref(),
      AddressField::Country => self.country.as_deref(),
      AddressField::ZipCode => self.zip_code.as_deref(),
    }
  }

  pub fn field_mut(&mut self, field: AddressField) -> &mut Option<String> {
    match field {
      AddressField::Street => &mut self.street,
      AddressField::City => &mut self.city,
      AddressField::State => &mut self.state,
      AddressField::Country => &mut self.country,
      AddressField::ZipCode => &mut self.zip_code,
    }
  }

  fn normalized(mut self) -> Self {
    for field in ADDRESS_FIELDS {
      let slot = self.field_mut(field);
      *slot = optional(slot.take());
    }
    self
  }

  /// Merge the parts present in `patch`; an empty string clears a part.
  fn merge(&mut self, mut patch: Address) {
    for field in ADDRESS_FIELDS {
      if let Some(value) = patch.field_mut(field).take() {
        *self.field_mut(field) = optional(Some(value));
      }
    }
  }
}

impl SocialMedia {
  pub fn field_mut(&mut self, field: SocialField) -> &mut Option<String> {
    match field {
      SocialField::Linkedin => &mut self.linkedin,
      SocialField::Twitter => &mut self.twitter,
      SocialField::Facebook => &mut self.facebook,
    }
  }

  fn normalized(mut self) -> Self {
    for field in SOCIAL_FIELDS {
      let slot = self.field_mut(field);
      *slot = optional(slot.take());
    }
    self
  }

  fn merge(&mut self, mut patch: SocialMedia) {
    for field in SOCIAL_FIELDS {
      if let Some(value) = patch.field_mut(field).take() {
        *self.field_mut(field) = optional(Some(value));
      }
    }
  }
}

const ADDRESS_FIELDS: [AddressField; 5] = [
  AddressField::Street,
  AddressField::City,
  AddressField::State,
  AddressField::Country,
  AddressField::ZipCode,
];

const SOCIAL_FIELDS: [SocialField; 3] =
  [SocialField::Linkedin, SocialField::Twitter, SocialField::Facebook];

// ─── Dotted field paths ──────────────────────────────────────────────────────

/// A nested form field addressed by dotted name, e.g. `address.city` or
/// `socialMedia.twitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPath {
  Address(AddressField),
  SocialMedia(SocialField),
}

impl FromStr for FieldPath {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let unknown = || Error::UnknownField(s.to_owned());
    let (parent, child) = s.split_once('.').ok_or_else(unknown)?;
    match parent {
      "address" => child
        .parse()
        .map(FieldPath::Address)
        .map_err(|_| unknown()),
      "socialMedia" => child
        .parse()
        .map(FieldPath::SocialMedia)
        .map_err(|_| unknown()),
      _ => Err(unknown()),
    }
  }
}

impl fmt::Display for FieldPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldPath::Address(field) => write!(f, "address.{}", field.as_ref()),
      FieldPath::SocialMedia(field) => {
        write!(f, "socialMedia.{}", field.as_ref())
      }
    }
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A stored contact record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
  pub id:                  Uuid,
  pub first_name:          String,
  pub last_name:           String,
  /// Unique across all contacts; enforced by the store.
  pub email:               String,
  pub phone:               Option<String>,
  pub company:             Option<String>,
  pub job_title:           Option<String>,
  pub tags:                Vec<String>,
  pub address:             Address,
  pub social_media:        SocialMedia,
  pub notes:               Option<String>,
  pub status:              ContactStatus,
  pub source:              Option<String>,
  pub last_contacted_date: Option<DateTime<Utc>>,
  /// Set by the store on creation.
  pub created_at:          DateTime<Utc>,
  /// Refreshed by the store on every mutation.
  pub updated_at:          DateTime<Utc>,
}

// ─── NewContact ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContactStore::add_contact`]. The id and both
/// timestamps are assigned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
  #[serde(default)]
  pub first_name:          String,
  #[serde(default)]
  pub last_name:           String,
  #[serde(default)]
  pub email:               String,
  pub phone:               Option<String>,
  pub company:             Option<String>,
  pub job_title:           Option<String>,
  #[serde(default)]
  pub tags:                Vec<String>,
  #[serde(default)]
  pub address:             Address,
  #[serde(default)]
  pub social_media:        SocialMedia,
  pub notes:               Option<String>,
  #[serde(default)]
  pub status:              ContactStatus,
  pub source:              Option<String>,
  pub last_contacted_date: Option<DateTime<Utc>>,
}

impl NewContact {
  /// Convenience constructor with all optional fields left empty.
  pub fn new(
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    email: impl Into<String>,
  ) -> Self {
    Self {
      first_name: first_name.into(),
      last_name: last_name.into(),
      email: email.into(),
      ..Self::default()
    }
  }

  /// Check required fields and canonicalise the rest: text is trimmed, empty
  /// optional text becomes absent and tags are deduplicated.
  pub fn normalized(self) -> Result<Self> {
    Ok(Self {
      first_name:          required("firstName", self.first_name)?,
      last_name:           required("lastName", self.last_name)?,
      email:               required("email", self.email)?,
      phone:               optional(self.phone),
      company:             optional(self.company),
      job_title:           optional(self.job_title),
      tags:                normalize_tags(self.tags),
      address:             self.address.normalized(),
      social_media:        self.social_media.normalized(),
      notes:               optional(self.notes),
      status:              self.status,
      source:              optional(self.source),
      last_contacted_date: self.last_contacted_date,
    })
  }
}

// ─── ContactPatch ────────────────────────────────────────────────────────────

/// A partial update. Absent fields are left unchanged; an empty string clears
/// an optional text field and `null` clears `last_contacted_date`. `address`
/// and `social_media` merge part-by-part.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
  pub first_name:          Option<String>,
  pub last_name:           Option<String>,
  pub email:               Option<String>,
  pub phone:               Option<String>,
  pub company:             Option<String>,
  pub job_title:           Option<String>,
  pub tags:                Option<Vec<String>>,
  pub address:             Option<Address>,
  pub social_media:        Option<SocialMedia>,
  pub notes:               Option<String>,
  pub status:              Option<ContactStatus>,
  pub source:              Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub last_contacted_date: Option<Option<DateTime<Utc>>>,
}

/// `Some(None)` for an explicit `null`; absent fields stay `None` via
/// `#[serde(default)]`.
fn present<'de, D, T>(
  deserializer: D,
) -> std::result::Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

impl ContactPatch {
  /// Set a nested field addressed by a [`FieldPath`].
  pub fn set(&mut self, path: FieldPath, value: impl Into<String>) {
    let value = Some(value.into());
    match path {
      FieldPath::Address(field) => {
        *self.address.get_or_insert_with(Address::default).field_mut(field) =
          value;
      }
      FieldPath::SocialMedia(field) => {
        *self
          .social_media
          .get_or_insert_with(SocialMedia::default)
          .field_mut(field) = value;
      }
    }
  }

  /// Apply this patch to `contact`. Required fields are validated before
  /// anything is written, so on error `contact` is untouched.
  pub fn apply_to(self, contact: &mut Contact) -> Result<()> {
    let first_name =
      self.first_name.map(|v| required("firstName", v)).transpose()?;
    let last_name =
      self.last_name.map(|v| required("lastName", v)).transpose()?;
    let email = self.email.map(|v| required("email", v)).transpose()?;

    if let Some(v) = first_name {
      contact.first_name = v;
    }
    if let Some(v) = last_name {
      contact.last_name = v;
    }
    if let Some(v) = email {
      contact.email = v;
    }

    let optional_text = [
      (self.phone, &mut contact.phone),
      (self.company, &mut contact.company),
      (self.job_title, &mut contact.job_title),
      (self.notes, &mut contact.notes),
      (self.source, &mut contact.source),
    ];
    for (value, slot) in optional_text {
      if let Some(v) = value {
        *slot = optional(Some(v));
      }
    }

    if let Some(tags) = self.tags {
      contact.tags = normalize_tags(tags);
    }
    if let Some(address) = self.address {
      contact.address.merge(address);
    }
    if let Some(social) = self.social_media {
      contact.social_media.merge(social);
    }
    if let Some(status) = self.status {
      contact.status = status;
    }
    if let Some(at) = self.last_contacted_date {
      contact.last_contacted_date = at;
    }
    Ok(())
  }
}

// ─── Normalisation helpers ───────────────────────────────────────────────────

fn required(name: &str, value: String) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation(format!("{name} is required")));
  }
  Ok(trimmed.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// Trim labels, drop empty ones and remove duplicates, keeping the first
/// occurrence of each.
pub fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for tag in tags {
    let tag = tag.trim();
    if !tag.is_empty() && !out.iter().any(|t| t == tag) {
      out.push(tag.to_owned());
    }
  }
  out
}
