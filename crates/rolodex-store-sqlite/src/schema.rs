//! SQL schema for the Rolodex SQLite store.
//!
//! Executed once when the shared connection is first opened.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Address and social-media sub-records are flattened into columns so the
-- query builder can filter on them directly.
CREATE TABLE IF NOT EXISTS contacts (
    contact_id          TEXT PRIMARY KEY,
    first_name          TEXT NOT NULL,
    last_name           TEXT NOT NULL,
    email               TEXT NOT NULL,
    phone               TEXT,
    company             TEXT,
    job_title           TEXT,
    tags                TEXT NOT NULL DEFAULT '[]',   -- JSON array of labels
    address_street      TEXT,
    address_city        TEXT,
    address_state       TEXT,
    address_country     TEXT,
    address_zip_code    TEXT,
    social_linkedin     TEXT,
    social_twitter      TEXT,
    social_facebook     TEXT,
    notes               TEXT,
    status              TEXT NOT NULL DEFAULT 'lead',
    source              TEXT,
    last_contacted_date TEXT,
    created_at          TEXT NOT NULL,                -- fixed-width RFC 3339 UTC
    updated_at          TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS contacts_email_idx   ON contacts(email);
CREATE INDEX        IF NOT EXISTS contacts_created_idx ON contacts(created_at);
CREATE INDEX        IF NOT EXISTS contacts_status_idx  ON contacts(status);

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    first_name        TEXT NOT NULL,
    last_name         TEXT NOT NULL,
    email             TEXT NOT NULL,
    password_hash     TEXT NOT NULL,
    role              TEXT NOT NULL DEFAULT 'user',
    is_email_verified INTEGER NOT NULL DEFAULT 0,
    last_login_at     TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS users_email_idx ON users(email);

PRAGMA user_version = 1;
";
