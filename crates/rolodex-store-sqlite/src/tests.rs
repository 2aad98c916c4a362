//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use rolodex_core::{
  contact::{Address, ContactPatch, ContactStatus, NewContact},
  query::{ContactListParams, ContactQuery, list},
  store::{ContactStore, StoreError as _, UserStore},
  user::{NewUser, Role},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn params() -> ContactListParams { ContactListParams::default() }

fn query(p: &ContactListParams) -> ContactQuery {
  ContactQuery::from_params(p).expect("valid params")
}

async fn seed(s: &SqliteStore, n: usize) {
  for i in 0..n {
    s.add_contact(NewContact::new(
      format!("First{i:02}"),
      format!("Last{i:02}"),
      format!("person{i:02}@example.com"),
    ))
    .await
    .unwrap();
  }
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_contact() {
  let s = store().await;

  let mut input = NewContact::new("Ada", "Lovelace", "ada@example.com");
  input.company = Some("Analytical Engines".into());
  input.tags = vec!["vip".into()];
  input.address = Address {
    city: Some("London".into()),
    ..Address::default()
  };
  let created = s.add_contact(input).await.unwrap();

  assert_eq!(created.status, ContactStatus::Lead);
  assert_eq!(created.created_at, created.updated_at);

  let fetched = s.get_contact(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_contact_missing_returns_none() {
  let s = store().await;
  assert!(s.get_contact(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected_without_writing() {
  let s = store().await;
  s.add_contact(NewContact::new("A", "One", "dup@example.com"))
    .await
    .unwrap();

  let err = s
    .add_contact(NewContact::new("B", "Two", "dup@example.com"))
    .await
    .unwrap_err();
  assert!(err.is_duplicate_email());
  assert!(matches!(err, Error::DuplicateEmail(ref e) if e == "dup@example.com"));

  let total = s.count_contacts(&Default::default()).await.unwrap();
  assert_eq!(total, 1);
}

#[tokio::test]
async fn replace_keeps_created_at_and_bumps_updated_at() {
  let s = store().await;
  let created = s
    .add_contact(NewContact::new("Grace", "Hopper", "grace@example.com"))
    .await
    .unwrap();

  let mut edited = created.clone();
  ContactPatch {
    company: Some("US Navy".into()),
    status: Some(ContactStatus::Customer),
    ..ContactPatch::default()
  }
  .apply_to(&mut edited)
  .unwrap();
  edited.created_at = created.created_at - Duration::days(30);

  let stored = s.replace_contact(edited).await.unwrap().unwrap();
  assert_eq!(stored.company.as_deref(), Some("US Navy"));
  assert_eq!(stored.status, ContactStatus::Customer);
  assert_eq!(stored.created_at, created.created_at);
  assert!(stored.updated_at >= created.updated_at);
}

#[tokio::test]
async fn replace_missing_returns_none() {
  let s = store().await;
  let ghost = s
    .add_contact(NewContact::new("Temp", "Contact", "temp@example.com"))
    .await
    .unwrap();
  assert!(s.delete_contact(ghost.id).await.unwrap());

  assert!(s.replace_contact(ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn replace_onto_taken_email_is_rejected() {
  let s = store().await;
  s.add_contact(NewContact::new("A", "One", "one@example.com"))
    .await
    .unwrap();
  let mut two = s
    .add_contact(NewContact::new("B", "Two", "two@example.com"))
    .await
    .unwrap();

  two.email = "one@example.com".into();
  let err = s.replace_contact(two.clone()).await.unwrap_err();
  assert!(err.is_duplicate_email());

  let still = s.get_contact(two.id).await.unwrap().unwrap();
  assert_eq!(still.email, "two@example.com");
}

#[tokio::test]
async fn delete_reports_whether_anything_was_removed() {
  let s = store().await;
  let c = s
    .add_contact(NewContact::new("X", "Y", "xy@example.com"))
    .await
    .unwrap();

  assert!(s.delete_contact(c.id).await.unwrap());
  assert!(!s.delete_contact(c.id).await.unwrap());
  assert!(s.get_contact(c.id).await.unwrap().is_none());
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_filter_returns_only_that_status() {
  let s = store().await;
  for (i, status) in [
    ContactStatus::Active,
    ContactStatus::Lead,
    ContactStatus::Active,
    ContactStatus::Customer,
  ]
  .into_iter()
  .enumerate()
  {
    let mut c = NewContact::new("S", format!("{i}"), format!("s{i}@example.com"));
    c.status = status;
    s.add_contact(c).await.unwrap();
  }

  let page = list(&s, &query(&ContactListParams {
    status: Some("active".into()),
    ..params()
  }))
  .await
  .unwrap();

  assert_eq!(page.pagination.total, 2);
  assert!(page.contacts.iter().all(|c| c.status == ContactStatus::Active));
}

#[tokio::test]
async fn second_page_of_fifteen() {
  let s = store().await;
  seed(&s, 15).await;

  let page = list(&s, &query(&ContactListParams {
    page: Some("2".into()),
    limit: Some("10".into()),
    ..params()
  }))
  .await
  .unwrap();

  assert_eq!(page.contacts.len(), 5);
  assert_eq!(page.pagination.total, 15);
  assert_eq!(page.pagination.total_pages, 2);
  assert!(!page.pagination.has_more);
}

#[tokio::test]
async fn page_past_the_end_is_empty_but_counted() {
  let s = store().await;
  seed(&s, 3).await;

  let page = list(&s, &query(&ContactListParams {
    page: Some("5".into()),
    ..params()
  }))
  .await
  .unwrap();

  assert!(page.contacts.is_empty());
  assert_eq!(page.pagination.total, 3);
  assert!(!page.pagination.has_more);
}

#[tokio::test]
async fn tag_filter_matches_any_listed_tag() {
  let s = store().await;
  for (i, tags) in [
    vec!["vip"],
    vec!["partner", "press"],
    vec!["press"],
    vec![],
  ]
  .into_iter()
  .enumerate()
  {
    let mut c = NewContact::new("T", format!("{i}"), format!("t{i}@example.com"));
    c.tags = tags.into_iter().map(String::from).collect();
    s.add_contact(c).await.unwrap();
  }

  let page = list(&s, &query(&ContactListParams {
    tags: Some("vip,partner".into()),
    ..params()
  }))
  .await
  .unwrap();

  assert_eq!(page.pagination.total, 2);
  let mut names: Vec<_> =
    page.contacts.iter().map(|c| c.last_name.as_str()).collect();
  names.sort();
  assert_eq!(names, ["0", "1"]);
}

#[tokio::test]
async fn free_text_and_location_filters_agree_with_in_memory_predicate() {
  let s = store().await;
  let rows = [
    ("Ann", "Smith", Some("Acme"), Some("Boston"), Some("met at conf")),
    ("Bob", "Annis", None, Some("boston"), None),
    ("Cat", "Jones", Some("ANNEX corp"), Some("Denver"), None),
    ("Dan", "Brown", None, None, Some("nothing here")),
    ("Eve", "Stone", Some("Acme"), Some("Austin"), Some("ANN mentioned")),
  ];
  for (i, (first, last, company, city, notes)) in rows.into_iter().enumerate()
  {
    let mut c = NewContact::new(first, last, format!("row{i}@example.com"));
    c.company = company.map(String::from);
    c.address.city = city.map(String::from);
    c.notes = notes.map(String::from);
    s.add_contact(c).await.unwrap();
  }

  let everyone = list(&s, &query(&ContactListParams {
    limit: Some("100".into()),
    ..params()
  }))
  .await
  .unwrap()
  .contacts;

  let cases = [
    ContactListParams {
      query: Some("ann".into()),
      ..params()
    },
    ContactListParams {
      city: Some("BOSTON".into()),
      ..params()
    },
    ContactListParams {
      query: Some("acme".into()),
      city: Some("aus".into()),
      ..params()
    },
    ContactListParams {
      company: Some("corp".into()),
      ..params()
    },
  ];

  for p in cases {
    let q = query(&ContactListParams {
      limit: Some("100".into()),
      ..p
    });
    let mut expected: Vec<Uuid> = everyone
      .iter()
      .filter(|c| q.filter.matches(c))
      .map(|c| c.id)
      .collect();
    let mut got: Vec<Uuid> =
      list(&s, &q).await.unwrap().contacts.iter().map(|c| c.id).collect();
    expected.sort();
    got.sort();
    assert_eq!(got, expected, "filter {:?}", q.filter);
  }
}

#[tokio::test]
async fn substring_filters_fold_non_ascii_case() {
  let s = store().await;
  let mut elodie = NewContact::new("ÉLODIE", "MÜLLER", "em@example.com");
  elodie.address.city = Some("ZÜRICH".into());
  let elodie = s.add_contact(elodie).await.unwrap();
  let mut other = NewContact::new("Emil", "Muller", "mu@example.com");
  other.address.city = Some("Zurich".into());
  let other = s.add_contact(other).await.unwrap();

  let cases = [
    ContactListParams {
      query: Some("élodie".into()),
      ..params()
    },
    ContactListParams {
      query: Some("müller".into()),
      ..params()
    },
    ContactListParams {
      city: Some("zürich".into()),
      ..params()
    },
  ];

  for p in cases {
    let q = query(&p);
    let page = list(&s, &q).await.unwrap();
    assert_eq!(page.pagination.total, 1, "{p:?}");
    assert_eq!(page.contacts[0].id, elodie.id);
    assert!(q.filter.matches(&elodie));
    assert!(!q.filter.matches(&other));
  }
}

#[tokio::test]
async fn sort_by_last_name_ascending() {
  let s = store().await;
  for (i, last) in ["Moreau", "Abbott", "Zhang"].into_iter().enumerate() {
    s.add_contact(NewContact::new("P", last, format!("p{i}@example.com")))
      .await
      .unwrap();
  }

  let page = list(&s, &query(&ContactListParams {
    sort_by: Some("lastName".into()),
    sort_order: Some("asc".into()),
    ..params()
  }))
  .await
  .unwrap();

  let names: Vec<_> =
    page.contacts.iter().map(|c| c.last_name.as_str()).collect();
  assert_eq!(names, ["Abbott", "Moreau", "Zhang"]);
}

#[tokio::test]
async fn pages_are_disjoint_under_sort_key_ties() {
  let s = store().await;
  for i in 0..7 {
    let mut c = NewContact::new("Same", "Name", format!("tie{i}@example.com"));
    c.company = Some("Tied".into());
    s.add_contact(c).await.unwrap();
  }

  let mut seen = Vec::new();
  for page in 1..=3 {
    let q = query(&ContactListParams {
      sort_by: Some("company".into()),
      page: Some(page.to_string()),
      limit: Some("3".into()),
      ..params()
    });
    seen.extend(list(&s, &q).await.unwrap().contacts.into_iter().map(|c| c.id));
  }

  let mut unique = seen.clone();
  unique.sort();
  unique.dedup();
  assert_eq!(seen.len(), 7);
  assert_eq!(unique.len(), 7);
}

#[tokio::test]
async fn listing_twice_gives_the_same_page() {
  let s = store().await;
  seed(&s, 12).await;

  let q = query(&ContactListParams {
    page: Some("2".into()),
    limit: Some("4".into()),
    ..params()
  });
  let a: Vec<_> = list(&s, &q).await.unwrap().contacts;
  let b: Vec<_> = list(&s, &q).await.unwrap().contacts;
  assert_eq!(a, b);
}

#[tokio::test]
async fn created_date_bounds_are_inclusive() {
  let s = store().await;
  seed(&s, 2).await;

  let yesterday = (Utc::now() - Duration::days(1)).format("%Y-%m-%d");
  let tomorrow = (Utc::now() + Duration::days(1)).format("%Y-%m-%d");

  let inside = list(&s, &query(&ContactListParams {
    created_after: Some(yesterday.to_string()),
    created_before: Some(tomorrow.to_string()),
    ..params()
  }))
  .await
  .unwrap();
  assert_eq!(inside.pagination.total, 2);

  let after = list(&s, &query(&ContactListParams {
    created_after: Some(tomorrow.to_string()),
    ..params()
  }))
  .await
  .unwrap();
  assert_eq!(after.pagination.total, 0);

  let exact = s
    .add_contact(NewContact::new("Edge", "Case", "edge@example.com"))
    .await
    .unwrap();
  let at = exact.created_at.to_rfc3339();
  let bounded = list(&s, &query(&ContactListParams {
    created_after: Some(at.clone()),
    created_before: Some(at),
    ..params()
  }))
  .await
  .unwrap();
  assert_eq!(bounded.pagination.total, 1);
  assert_eq!(bounded.contacts[0].id, exact.id);
}

// ─── Users ───────────────────────────────────────────────────────────────────

fn new_user(email: &str) -> NewUser {
  NewUser {
    first_name:    "Jo".into(),
    last_name:     "Doe".into(),
    email:         email.into(),
    password_hash: "$argon2id$v=19$stub".into(),
    role:          Role::User,
  }
}

#[tokio::test]
async fn add_and_find_user() {
  let s = store().await;
  let user = s.add_user(new_user("jo@example.com")).await.unwrap();
  assert!(!user.is_email_verified);
  assert!(user.last_login_at.is_none());

  let by_email = s.find_user_by_email("jo@example.com").await.unwrap().unwrap();
  assert_eq!(by_email.id, user.id);
  assert_eq!(by_email.password_hash, user.password_hash);

  let by_id = s.get_user(user.id).await.unwrap().unwrap();
  assert_eq!(by_id.email, "jo@example.com");

  assert!(s.find_user_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_user_email_is_rejected() {
  let s = store().await;
  s.add_user(new_user("jo@example.com")).await.unwrap();
  let err = s.add_user(new_user("jo@example.com")).await.unwrap_err();
  assert!(err.is_duplicate_email());
}

#[tokio::test]
async fn record_login_stamps_last_login() {
  let s = store().await;
  let user = s.add_user(new_user("jo@example.com")).await.unwrap();

  let at = Utc::now();
  let updated = s.record_login(user.id, at).await.unwrap().unwrap();
  let stamped = updated.last_login_at.unwrap();
  assert!((stamped - at).num_milliseconds().abs() < 1);

  assert!(s.record_login(Uuid::new_v4(), at).await.unwrap().is_none());
}

// ─── Lazy connection ─────────────────────────────────────────────────────────

#[tokio::test]
async fn lazy_store_connects_on_first_use() {
  let s = SqliteStore::in_memory();
  assert!(!s.is_connected());
  s.add_contact(NewContact::new("L", "Azy", "lazy@example.com"))
    .await
    .unwrap();
  assert!(s.is_connected());

  let clone = s.clone();
  assert_eq!(clone.count_contacts(&Default::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn failed_connect_is_retried_on_next_use() {
  let dir = std::env::temp_dir().join(format!("rolodex-{}", Uuid::new_v4()));
  let s = SqliteStore::new(dir.join("rolodex.db"));

  assert!(s.get_contact(Uuid::new_v4()).await.is_err());
  assert!(!s.is_connected());

  std::fs::create_dir_all(&dir).unwrap();
  assert!(s.get_contact(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.is_connected());

  drop(s);
  let _ = std::fs::remove_dir_all(&dir);
}
