//! SQL schema for the sift SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per (partition_key, sort_key). Rows are replaced only when the
-- write's condition admits it; they are removed only by expiry purges.
CREATE TABLE IF NOT EXISTS records (
    partition_key TEXT    NOT NULL,
    sort_key      TEXT    NOT NULL,
    expires_at    INTEGER NOT NULL,  -- microseconds since the Unix epoch
    created_at    TEXT,              -- ISO 8601 UTC or NULL
    payload       TEXT    NOT NULL,  -- opaque to the store
    PRIMARY KEY (partition_key, sort_key)
);

CREATE INDEX IF NOT EXISTS records_expires_idx ON records(expires_at);

PRAGMA user_version = 1;
";
