//! [`SqliteStore`] — the SQLite implementation of [`KeyedStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use sift_core::store::{Condition, KeyedStore, PutOutcome, Record};

use crate::{
  Error, Result,
  encode::{RawRecord, encode_instant},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A sift record store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Unconditional upsert. Conditional writes append a `WHERE` guard.
const INSERT: &str = "INSERT INTO records (partition_key, sort_key, expires_at, created_at, payload)
   VALUES (?1, ?2, ?3, ?4, ?5)
   ON CONFLICT (partition_key, sort_key) DO UPDATE SET
     expires_at = excluded.expires_at,
     created_at = excluded.created_at,
     payload    = excluded.payload";

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── KeyedStore impl ─────────────────────────────────────────────────────────

impl KeyedStore for SqliteStore {
  type Error = Error;

  async fn conditional_put(&self, record: Record, condition: Condition) -> Result<PutOutcome> {
    let raw = RawRecord::from_record(record);
    let threshold = match condition {
      Condition::Always => None,
      Condition::AbsentOrExpiredAt(t) => Some(encode_instant(t)),
    };

    let (changed, blocking): (usize, Option<RawRecord>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let changed = match threshold {
          None => tx.execute(
            INSERT,
            rusqlite::params![
              raw.partition_key,
              raw.sort_key,
              raw.expires_at,
              raw.created_at,
              raw.payload,
            ],
          )?,
          // The WHERE clause turns the upsert into "insert if absent or
          // expired"; a live row makes it a no-op with zero changes.
          Some(t) => tx.execute(
            &format!("{INSERT} WHERE records.expires_at <= ?6"),
            rusqlite::params![
              raw.partition_key,
              raw.sort_key,
              raw.expires_at,
              raw.created_at,
              raw.payload,
              t,
            ],
          )?,
        };

        let blocking = if changed == 0 {
          tx.query_row(
            &format!(
              "SELECT {} FROM records WHERE partition_key = ?1 AND sort_key = ?2",
              RawRecord::COLUMNS
            ),
            rusqlite::params![raw.partition_key, raw.sort_key],
            RawRecord::from_row,
          )
          .optional()?
        } else {
          None
        };

        tx.commit()?;
        Ok((changed, blocking))
      })
      .await?;

    if changed > 0 {
      return Ok(PutOutcome::Written);
    }
    Ok(PutOutcome::Conflict(blocking.map(RawRecord::into_record).transpose()?))
  }

  async fn get(&self, partition_key: &str, sort_key: &str) -> Result<Option<Record>> {
    let pk = partition_key.to_owned();
    let sk = sort_key.to_owned();

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM records WHERE partition_key = ?1 AND sort_key = ?2",
                RawRecord::COLUMNS
              ),
              rusqlite::params![pk, sk],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn get_all(&self, partition_key: &str) -> Result<Vec<Record>> {
    let pk = partition_key.to_owned();

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM records WHERE partition_key = ?1",
          RawRecord::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pk], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let threshold = encode_instant(now);

    let purged = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM records WHERE expires_at <= ?1",
          rusqlite::params![threshold],
        )?)
      })
      .await?;

    Ok(purged)
  }
}
