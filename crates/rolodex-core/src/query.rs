//! The contact query builder.
//!
//! Turns the flat, optional parameters of a listing request into a
//! [`ContactQuery`]: a conjunction of filter [`Clause`]s, a [`Sort`], and a
//! [`PageWindow`]. Store backends translate the filter into their own
//! predicate language; [`ContactFilter::matches`] is the in-memory reference
//! for what a translation must select.
//!
//! Substring clauses fold case with Unicode lowercasing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::{
  Error, Result,
  contact::{AddressField, Contact, ContactStatus},
  store::ContactStore,
};

// ─── Request parameters ──────────────────────────────────────────────────────

/// Raw listing parameters, exactly as they arrive on the query string.
///
/// Every field is kept as text so that malformed numbers can fall back to
/// defaults instead of failing deserialisation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListParams {
  pub query:          Option<String>,
  pub status:         Option<String>,
  /// Comma-separated; matches contacts carrying any of the tags.
  pub tags:           Option<String>,
  pub company:        Option<String>,
  pub job_title:      Option<String>,
  pub city:           Option<String>,
  pub state:          Option<String>,
  pub country:        Option<String>,
  pub created_after:  Option<String>,
  pub created_before: Option<String>,
  pub sort_by:        Option<String>,
  pub sort_order:     Option<String>,
  pub page:           Option<String>,
  pub limit:          Option<String>,
}

// ─── Filter clauses ──────────────────────────────────────────────────────────

/// A text field a substring clause can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
  FirstName,
  LastName,
  Email,
  Company,
  JobTitle,
  Notes,
  City,
  State,
  Country,
}

impl TextField {
  pub fn value(self, contact: &Contact) -> Option<&str> {
    match self {
      Self::FirstName => Some(contact.first_name.as_str()),
      Self::LastName => Some(contact.last_name.as_str()),
      Self::Email => Some(contact.email.as_str()),
      Self::Company => contact.company.as_deref(),
      Self::JobTitle => contact.job_title.as_deref(),
      Self::Notes => contact.notes.as_deref(),
      Self::City => contact.address.field(AddressField::City),
      Self::State => contact.address.field(AddressField::State),
      Self::Country => contact.address.field(AddressField::Country),
    }
  }
}

/// Fields searched by the free-text `query` parameter.
pub const SEARCH_FIELDS: &[TextField] = &[
  TextField::FirstName,
  TextField::LastName,
  TextField::Email,
  TextField::Company,
  TextField::JobTitle,
  TextField::Notes,
];

/// A single predicate derived from one request parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
  /// Substring match on any of `fields`. `needle` is already lowercased.
  AnyContains {
    fields: &'static [TextField],
    needle: String,
  },
  /// Substring match on one field. `needle` is already lowercased.
  Contains { field: TextField, needle: String },
  StatusIs(ContactStatus),
  /// The contact carries at least one of these tags.
  HasAnyTag(Vec<String>),
  /// Inclusive lower bound on `created_at`.
  CreatedAtLeast(DateTime<Utc>),
  /// Inclusive upper bound on `created_at`.
  CreatedAtMost(DateTime<Utc>),
}

impl Clause {
  pub fn matches(&self, contact: &Contact) -> bool {
    match self {
      Self::AnyContains { fields, needle } => fields
        .iter()
        .any(|f| contains_folded(f.value(contact), needle)),
      Self::Contains { field, needle } => {
        contains_folded(field.value(contact), needle)
      }
      Self::StatusIs(status) => contact.status == *status,
      Self::HasAnyTag(tags) => contact.tags.iter().any(|t| tags.contains(t)),
      Self::CreatedAtLeast(at) => contact.created_at >= *at,
      Self::CreatedAtMost(at) => contact.created_at <= *at,
    }
  }
}

fn contains_folded(haystack: Option<&str>, needle: &str) -> bool {
  haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

/// The AND of zero or more clauses. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFilter {
  pub clauses: Vec<Clause>,
}

impl ContactFilter {
  pub fn matches(&self, contact: &Contact) -> bool {
    self.clauses.iter().all(|c| c.matches(contact))
  }
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum SortField {
  #[default]
  CreatedAt,
  UpdatedAt,
  FirstName,
  LastName,
  Email,
  Company,
  JobTitle,
  Status,
  LastContactedDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Single-field sort. Backends break ties on the contact id in the same
/// direction so that pages never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
  pub field: SortField,
  pub order: SortOrder,
}

impl Sort {
  /// Unknown field names fall back to `createdAt`; any order other than
  /// `asc` sorts descending.
  pub fn from_params(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
    Self {
      field: sort_by.and_then(|s| s.parse().ok()).unwrap_or_default(),
      order: match sort_order {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
      },
    }
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// A one-based page of `limit` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
  pub page:  u32,
  pub limit: u32,
}

impl PageWindow {
  pub const DEFAULT_LIMIT: u32 = 10;
  pub const MAX_LIMIT: u32 = 100;

  /// Missing, non-numeric or non-positive values fall back to the defaults.
  pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
    Self {
      page:  positive(page).unwrap_or(1),
      limit: positive(limit)
        .unwrap_or(Self::DEFAULT_LIMIT)
        .min(Self::MAX_LIMIT),
    }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
  }
}

impl Default for PageWindow {
  fn default() -> Self {
    Self {
      page:  1,
      limit: Self::DEFAULT_LIMIT,
    }
  }
}

fn positive(raw: Option<&str>) -> Option<u32> {
  raw
    .and_then(|s| s.trim().parse::<u32>().ok())
    .filter(|n| *n >= 1)
}

/// Pagination metadata returned alongside a page of contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
  pub total:       u64,
  pub page:        u32,
  pub limit:       u32,
  pub total_pages: u64,
  pub has_more:    bool,
}

impl Pagination {
  pub fn new(window: PageWindow, total: u64, returned: usize) -> Self {
    let limit = u64::from(window.limit);
    Self {
      total,
      page: window.page,
      limit: window.limit,
      total_pages: total.div_ceil(limit),
      has_more: window.offset() + (returned as u64) < total,
    }
  }
}

// ─── ContactQuery ────────────────────────────────────────────────────────────

/// A fully-built listing query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactQuery {
  pub filter: ContactFilter,
  pub sort:   Sort,
  pub window: PageWindow,
}

impl ContactQuery {
  /// Build a query from raw request parameters.
  ///
  /// Blank parameters impose no constraint. An unknown status or a date that
  /// is neither RFC 3339 nor `YYYY-MM-DD` is rejected.
  pub fn from_params(params: &ContactListParams) -> Result<Self> {
    let mut clauses = Vec::new();

    if let Some(q) = non_empty(&params.query) {
      clauses.push(Clause::AnyContains {
        fields: SEARCH_FIELDS,
        needle: q.to_lowercase(),
      });
    }

    if let Some(s) = non_empty(&params.status) {
      let status = s
        .parse::<ContactStatus>()
        .map_err(|_| Error::UnknownStatus(s.to_owned()))?;
      clauses.push(Clause::StatusIs(status));
    }

    if let Some(raw) = non_empty(&params.tags) {
      let tags: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect();
      if !tags.is_empty() {
        clauses.push(Clause::HasAnyTag(tags));
      }
    }

    let substring_params = [
      (&params.company, TextField::Company),
      (&params.job_title, TextField::JobTitle),
      (&params.city, TextField::City),
      (&params.state, TextField::State),
      (&params.country, TextField::Country),
    ];
    for (param, field) in substring_params {
      if let Some(v) = non_empty(param) {
        clauses.push(Clause::Contains {
          field,
          needle: v.to_lowercase(),
        });
      }
    }

    if let Some(v) = non_empty(&params.created_after) {
      clauses.push(Clause::CreatedAtLeast(parse_date("createdAfter", v)?));
    }
    if let Some(v) = non_empty(&params.created_before) {
      clauses.push(Clause::CreatedAtMost(parse_date("createdBefore", v)?));
    }

    Ok(Self {
      filter: ContactFilter { clauses },
      sort:   Sort::from_params(
        params.sort_by.as_deref(),
        params.sort_order.as_deref(),
      ),
      window: PageWindow::from_params(
        params.page.as_deref(),
        params.limit.as_deref(),
      ),
    })
  }
}

fn non_empty(param: &Option<String>) -> Option<&str> {
  param.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD`, read as midnight
/// UTC.
fn parse_date(param: &'static str, value: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .ok_or_else(|| Error::InvalidDate {
      param,
      value: value.to_owned(),
    })
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// One page of a contact listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPage {
  pub contacts:   Vec<Contact>,
  pub pagination: Pagination,
}

/// Count every match of `query.filter`, then fetch the requested window.
pub async fn list<S: ContactStore>(
  store: &S,
  query: &ContactQuery,
) -> Result<ContactPage, S::Error> {
  let total = store.count_contacts(&query.filter).await?;
  let contacts = store.find_contacts(query).await?;
  let pagination = Pagination::new(query.window, total, contacts.len());
  Ok(ContactPage {
    contacts,
    pagination,
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::contact::{Address, SocialMedia};

  fn params() -> ContactListParams { ContactListParams::default() }

  fn contact(first: &str, status: ContactStatus, tags: &[&str]) -> Contact {
    let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
    Contact {
      id:                  Uuid::new_v4(),
      first_name:          first.into(),
      last_name:           "Smith".into(),
      email:               format!("{}@example.com", first.to_lowercase()),
      phone:               None,
      company:             Some("Globex Corporation".into()),
      job_title:           Some("Engineer".into()),
      tags:                tags.iter().map(|t| t.to_string()).collect(),
      address:             Address {
        city: Some("Springfield".into()),
        ..Address::default()
      },
      social_media:        SocialMedia::default(),
      notes:               None,
      status,
      source:              None,
      last_contacted_date: None,
      created_at:          at,
      updated_at:          at,
    }
  }

  #[test]
  fn empty_params_build_an_unconstrained_query() {
    let q = ContactQuery::from_params(&params()).unwrap();
    assert!(q.filter.clauses.is_empty());
    assert_eq!(q.sort.field, SortField::CreatedAt);
    assert_eq!(q.sort.order, SortOrder::Desc);
    assert_eq!(q.window, PageWindow { page: 1, limit: 10 });
  }

  #[test]
  fn blank_params_are_ignored() {
    let p = ContactListParams {
      query: Some("  ".into()),
      status: Some("".into()),
      tags: Some(" , ,".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert!(q.filter.clauses.is_empty());
  }

  #[test]
  fn free_text_is_an_or_across_search_fields() {
    let p = ContactListParams {
      query: Some("GLOBEX".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert_eq!(q.filter.clauses, vec![Clause::AnyContains {
      fields: SEARCH_FIELDS,
      needle: "globex".into(),
    }]);
    assert!(q.filter.matches(&contact("Ann", ContactStatus::Lead, &[])));
  }

  #[test]
  fn substring_folds_non_ascii_case() {
    let mut c = contact("ÉLODIE", ContactStatus::Lead, &[]);
    c.last_name = "MÜLLER".into();
    c.address.city = Some("ZÜRICH".into());

    for p in [
      ContactListParams {
        query: Some("élodie".into()),
        ..params()
      },
      ContactListParams {
        query: Some("Müller".into()),
        ..params()
      },
      ContactListParams {
        city: Some("zürich".into()),
        ..params()
      },
    ] {
      let q = ContactQuery::from_params(&p).unwrap();
      assert!(q.filter.matches(&c), "{p:?}");
    }
  }

  #[test]
  fn status_filter_is_exact() {
    let p = ContactListParams {
      status: Some("active".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert!(q.filter.matches(&contact("A", ContactStatus::Active, &[])));
    assert!(!q.filter.matches(&contact("B", ContactStatus::Lead, &[])));
  }

  #[test]
  fn unknown_status_is_rejected() {
    let p = ContactListParams {
      status: Some("vip".into()),
      ..params()
    };
    assert!(matches!(
      ContactQuery::from_params(&p),
      Err(Error::UnknownStatus(ref s)) if s == "vip"
    ));
  }

  #[test]
  fn tags_match_any_requested_tag() {
    let p = ContactListParams {
      tags: Some("vip, partner".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert!(q.filter.matches(&contact("A", ContactStatus::Lead, &["vip"])));
    assert!(q.filter.matches(&contact("B", ContactStatus::Lead, &["partner"])));
    assert!(!q.filter.matches(&contact("C", ContactStatus::Lead, &["other"])));
    assert!(!q.filter.matches(&contact("D", ContactStatus::Lead, &[])));
  }

  #[test]
  fn clauses_are_combined_with_and() {
    let p = ContactListParams {
      status: Some("customer".into()),
      city: Some("spring".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert_eq!(q.filter.clauses.len(), 2);
    assert!(q.filter.matches(&contact("A", ContactStatus::Customer, &[])));
    assert!(!q.filter.matches(&contact("B", ContactStatus::Active, &[])));

    let mut elsewhere = contact("C", ContactStatus::Customer, &[]);
    elsewhere.address.city = Some("Shelbyville".into());
    assert!(!q.filter.matches(&elsewhere));
  }

  #[test]
  fn missing_optional_field_never_matches_substring() {
    let p = ContactListParams {
      country: Some("us".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert!(!q.filter.matches(&contact("A", ContactStatus::Lead, &[])));
  }

  #[test]
  fn date_bounds_are_inclusive() {
    let p = ContactListParams {
      created_after: Some("2024-03-15T12:00:00Z".into()),
      created_before: Some("2024-03-15T12:00:00+00:00".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert!(q.filter.matches(&contact("A", ContactStatus::Lead, &[])));
  }

  #[test]
  fn date_only_bound_is_midnight_utc() {
    let p = ContactListParams {
      created_after: Some("2024-03-16".into()),
      ..params()
    };
    let q = ContactQuery::from_params(&p).unwrap();
    assert_eq!(q.filter.clauses, vec![Clause::CreatedAtLeast(
      Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap()
    )]);
    assert!(!q.filter.matches(&contact("A", ContactStatus::Lead, &[])));
  }

  #[test]
  fn malformed_dates_are_rejected() {
    for (after, before) in [(Some("yesterday"), None), (None, Some("2024-13-01"))] {
      let p = ContactListParams {
        created_after: after.map(str::to_owned),
        created_before: before.map(str::to_owned),
        ..params()
      };
      assert!(matches!(
        ContactQuery::from_params(&p),
        Err(Error::InvalidDate { .. })
      ));
    }
  }

  #[test]
  fn sort_falls_back_to_created_at_descending() {
    assert_eq!(Sort::from_params(Some("lastName"), Some("asc")), Sort {
      field: SortField::LastName,
      order: SortOrder::Asc,
    });
    assert_eq!(
      Sort::from_params(Some("password"), Some("ASC")),
      Sort::default()
    );
  }

  #[test]
  fn malformed_page_and_limit_fall_back_to_defaults() {
    assert_eq!(
      PageWindow::from_params(Some("two"), Some("-5")),
      PageWindow::default()
    );
    assert_eq!(
      PageWindow::from_params(Some("0"), Some("0")),
      PageWindow::default()
    );
    assert_eq!(PageWindow::from_params(Some("3"), Some("1000")), PageWindow {
      page:  3,
      limit: PageWindow::MAX_LIMIT,
    });
  }

  #[test]
  fn offset_is_page_minus_one_times_limit() {
    assert_eq!(PageWindow { page: 1, limit: 10 }.offset(), 0);
    assert_eq!(PageWindow { page: 4, limit: 25 }.offset(), 75);
  }

  #[test]
  fn total_pages_is_ceiling_of_total_over_limit() {
    for limit in 1..=12u32 {
      for total in 0..=40u64 {
        let p = Pagination::new(PageWindow { page: 1, limit }, total, 0);
        let expected = (total + u64::from(limit) - 1) / u64::from(limit);
        assert_eq!(p.total_pages, expected, "total={total} limit={limit}");
      }
    }
  }

  #[test]
  fn has_more_tracks_the_window_end() {
    let window = PageWindow { page: 2, limit: 10 };
    let last = Pagination::new(window, 15, 5);
    assert!(!last.has_more);
    assert_eq!(last.total_pages, 2);

    let middle = Pagination::new(window, 25, 10);
    assert!(middle.has_more);

    let past_end = Pagination::new(PageWindow { page: 9, limit: 10 }, 15, 0);
    assert!(!past_end.has_more);
  }

  #[test]
  fn pagination_serialises_camel_case() {
    let p = Pagination::new(PageWindow::default(), 0, 0);
    let json = serde_json::to_value(p).unwrap();
    assert_eq!(json, serde_json::json!({
      "total": 0,
      "page": 1,
      "limit": 10,
      "totalPages": 0,
      "hasMore": false,
    }));
  }
}
