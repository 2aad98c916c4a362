//! Translation of a [`ContactFilter`] / [`ContactQuery`] into SQL.
//!
//! Column names only ever come from the enum mappings below; every
//! user-supplied value is bound as a parameter.

use rolodex_core::query::{
  Clause, ContactFilter, ContactQuery, SortField, SortOrder, TextField,
};
use rusqlite::types::Value;

use crate::encode::{CONTACT_COLUMNS, encode_dt};

/// A `WHERE` clause (empty when the filter is empty) and its positional
/// parameters.
#[derive(Debug, Default)]
pub struct SqlFilter {
  pub sql:    String,
  pub params: Vec<Value>,
}

fn text_column(field: TextField) -> &'static str {
  match field {
    TextField::FirstName => "first_name",
    TextField::LastName => "last_name",
    TextField::Email => "email",
    TextField::Company => "company",
    TextField::JobTitle => "job_title",
    TextField::Notes => "notes",
    TextField::City => "address_city",
    TextField::State => "address_state",
    TextField::Country => "address_country",
  }
}

fn sort_column(field: SortField) -> &'static str {
  match field {
    SortField::CreatedAt => "created_at",
    SortField::UpdatedAt => "updated_at",
    SortField::FirstName => "first_name",
    SortField::LastName => "last_name",
    SortField::Email => "email",
    SortField::Company => "company",
    SortField::JobTitle => "job_title",
    SortField::Status => "status",
    SortField::LastContactedDate => "last_contacted_date",
  }
}

/// Needles arrive lowercased; `fold` is registered when the connection opens.
fn contains(column: &str) -> String {
  format!("instr(fold({column}), ?) > 0")
}

pub fn where_clause(filter: &ContactFilter) -> SqlFilter {
  let mut conds: Vec<String> = Vec::new();
  let mut params: Vec<Value> = Vec::new();

  for clause in &filter.clauses {
    match clause {
      Clause::AnyContains { fields, needle } => {
        let ors: Vec<String> =
          fields.iter().map(|f| contains(text_column(*f))).collect();
        params.extend(fields.iter().map(|_| Value::Text(needle.clone())));
        conds.push(format!("({})", ors.join(" OR ")));
      }
      Clause::Contains { field, needle } => {
        conds.push(contains(text_column(*field)));
        params.push(Value::Text(needle.clone()));
      }
      Clause::StatusIs(status) => {
        conds.push("status = ?".to_owned());
        params.push(Value::Text(status.as_ref().to_owned()));
      }
      Clause::HasAnyTag(tags) => {
        let marks = vec!["?"; tags.len()].join(", ");
        conds.push(format!(
          "EXISTS (SELECT 1 FROM json_each(contacts.tags) t WHERE t.value IN ({marks}))"
        ));
        params.extend(tags.iter().cloned().map(Value::Text));
      }
      Clause::CreatedAtLeast(at) => {
        conds.push("created_at >= ?".to_owned());
        params.push(Value::Text(encode_dt(*at)));
      }
      Clause::CreatedAtMost(at) => {
        conds.push("created_at <= ?".to_owned());
        params.push(Value::Text(encode_dt(*at)));
      }
    }
  }

  let sql = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  SqlFilter { sql, params }
}

/// `SELECT COUNT(*)` over the filtered set.
pub fn count_sql(filter: &ContactFilter) -> SqlFilter {
  let SqlFilter { sql, params } = where_clause(filter);
  SqlFilter {
    sql: format!("SELECT COUNT(*) FROM contacts {sql}"),
    params,
  }
}

/// The windowed, sorted `SELECT` for `query`. Ties on the sort key are broken
/// by `contact_id` in the same direction.
pub fn find_sql(query: &ContactQuery) -> SqlFilter {
  let SqlFilter { sql, mut params } = where_clause(&query.filter);
  let column = sort_column(query.sort.field);
  let dir = match query.sort.order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  };
  params.push(Value::Integer(i64::from(query.window.limit)));
  params.push(Value::Integer(
    i64::try_from(query.window.offset()).unwrap_or(i64::MAX),
  ));
  SqlFilter {
    sql: format!(
      "SELECT {CONTACT_COLUMNS} FROM contacts {sql}
       ORDER BY {column} {dir}, contact_id {dir}
       LIMIT ? OFFSET ?"
    ),
    params,
  }
}
