//! v001 -- Initial schema creation.
//!
//! Creates the two keyspaces: `users` keyed by username and `tiers` keyed by
//! id with a unique `code`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    username      TEXT PRIMARY KEY NOT NULL,
    password_hash TEXT NOT NULL,                -- bcrypt
    role          TEXT NOT NULL CHECK (role IN ('user', 'admin')),
    created_at    TEXT NOT NULL                 -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Tiers
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tiers (
    id                          TEXT PRIMARY KEY NOT NULL,   -- ti_ + base-62
    code                        TEXT NOT NULL UNIQUE,
    name                        TEXT NOT NULL,
    message_limit               INTEGER NOT NULL DEFAULT 0 CHECK (message_limit >= 0),
    message_expiry_duration     INTEGER NOT NULL DEFAULT 0 CHECK (message_expiry_duration >= 0),     -- seconds
    email_limit                 INTEGER NOT NULL DEFAULT 0 CHECK (email_limit >= 0),
    reservation_limit           INTEGER NOT NULL DEFAULT 0 CHECK (reservation_limit >= 0),
    attachment_file_size_limit  INTEGER NOT NULL DEFAULT 0 CHECK (attachment_file_size_limit >= 0),  -- bytes
    attachment_total_size_limit INTEGER NOT NULL DEFAULT 0 CHECK (attachment_total_size_limit >= 0), -- bytes
    attachment_expiry_duration  INTEGER NOT NULL DEFAULT 0 CHECK (attachment_expiry_duration >= 0),  -- seconds
    attachment_bandwidth_limit  INTEGER NOT NULL DEFAULT 0 CHECK (attachment_bandwidth_limit >= 0),  -- bytes
    stripe_monthly_price_id     TEXT,
    stripe_yearly_price_id      TEXT
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
