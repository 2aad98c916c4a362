//! Handlers for `/contacts` endpoints. Every route requires an access token.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts` | Filter, sort and paginate; see [`ContactListParams`] |
//! | `POST`   | `/contacts` | Body: a contact without `id`/timestamps; 201 |
//! | `GET`    | `/contacts/{id}` | 404 if not found |
//! | `PUT`    | `/contacts/{id}` | Partial update; dotted keys such as `"address.city"` accepted |
//! | `DELETE` | `/contacts/{id}` | 404 if not found |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use rolodex_core::{
  contact::{Contact, ContactPatch, FieldPath, NewContact},
  query::{self, ContactListParams, ContactPage, ContactQuery},
  store::{ContactStore, UserStore},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError};

/// An id that does not parse as a UUID cannot name a contact.
fn contact_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::contact_not_found())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /contacts[?query=&status=&tags=&…&page=&limit=]`
pub async fn list<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  params: Result<Query<ContactListParams>, QueryRejection>,
) -> Result<Json<ContactPage>, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let Query(params) = params?;
  let query = ContactQuery::from_params(&params)?;
  tracing::debug!(?query, "listing contacts");

  let page = query::list(state.store.as_ref(), &query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(page))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /contacts`
pub async fn create<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  body: Result<Json<NewContact>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let Json(input) = body?;
  let input = input.normalized()?;

  let contact = state
    .store
    .add_contact(input)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(contact_id = %contact.id, "created contact");
  Ok((StatusCode::CREATED, Json(contact)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /contacts/{id}`
pub async fn get_one<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Contact>, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let id = contact_id(&id)?;
  let contact = state
    .store
    .get_contact(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(ApiError::contact_not_found)?;
  Ok(Json(contact))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// Keys a client may echo back from a fetched contact; they are never
/// written.
const READ_ONLY: &[&str] = &["id", "createdAt", "updatedAt"];

/// A partial update body: any [`ContactPatch`] field, plus nested form fields
/// addressed by dotted name.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub patch: ContactPatch,
  #[serde(flatten)]
  pub rest:  BTreeMap<String, Value>,
}

impl UpdateBody {
  /// Fold dotted keys into the patch. Unknown keys are rejected.
  pub fn into_patch(self) -> Result<ContactPatch, ApiError> {
    let mut patch = self.patch;
    for (key, value) in self.rest {
      if READ_ONLY.contains(&key.as_str()) {
        continue;
      }
      let path: FieldPath = key.parse()?;
      let value = match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        _ => {
          return Err(ApiError::BadRequest(format!("{key} must be a string")));
        }
      };
      patch.set(path, value);
    }
    Ok(patch)
  }
}

/// `PUT /contacts/{id}`
pub async fn update<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  body: Result<Json<UpdateBody>, JsonRejection>,
) -> Result<Json<Contact>, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let id = contact_id(&id)?;
  let Json(body) = body?;
  let patch = body.into_patch()?;

  let mut contact = state
    .store
    .get_contact(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(ApiError::contact_not_found)?;
  patch.apply_to(&mut contact)?;

  let contact = state
    .store
    .replace_contact(contact)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(ApiError::contact_not_found)?;
  Ok(Json(contact))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /contacts/{id}`
pub async fn delete_one<S>(
  _auth: Authenticated,
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: UserStore + Clone + 'static,
{
  let id = contact_id(&id)?;
  let deleted = state
    .store
    .delete_contact(id)
    .await
    .map_err(ApiError::from_store)?;
  if !deleted {
    return Err(ApiError::contact_not_found());
  }
  tracing::info!(contact_id = %id, "deleted contact");
  Ok(Json(json!({ "message": "Contact deleted successfully" })))
}
