//! Encoding and decoding helpers between [`Record`] and SQLite columns.
//!
//! `expires_at` is an integer so the condition and purge queries compare
//! numerically; `created_at` is an RFC 3339 string like every other
//! human-facing timestamp.

use chrono::{DateTime, Utc};
use sift_core::store::Record;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_instant(dt: DateTime<Utc>) -> i64 { dt.timestamp_micros() }

pub fn decode_instant(micros: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_micros(micros)
    .ok_or_else(|| Error::DateParse(format!("timestamp out of range: {micros}")))
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for a `records` row.
pub struct RawRecord {
  pub partition_key: String,
  pub sort_key:      String,
  pub expires_at:    i64,
  pub created_at:    Option<String>,
  pub payload:       String,
}

impl RawRecord {
  /// Column order matches [`RawRecord::COLUMNS`].
  pub const COLUMNS: &'static str =
    "partition_key, sort_key, expires_at, created_at, payload";

  pub fn from_record(record: Record) -> Self {
    Self {
      partition_key: record.partition_key,
      sort_key:      record.sort_key,
      expires_at:    encode_instant(record.expires_at),
      created_at:    record.created_at.map(encode_dt),
      payload:       record.payload,
    }
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      partition_key: row.get(0)?,
      sort_key:      row.get(1)?,
      expires_at:    row.get(2)?,
      created_at:    row.get(3)?,
      payload:       row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<Record> {
    Ok(Record {
      partition_key: self.partition_key,
      sort_key:      self.sort_key,
      expires_at:    decode_instant(self.expires_at)?,
      created_at:    self.created_at.as_deref().map(decode_dt).transpose()?,
      payload:       self.payload,
    })
  }
}
