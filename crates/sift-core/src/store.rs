//! The `KeyedStore` trait and the record shape it stores.
//!
//! The trait is implemented by storage backends (e.g. `sift-store-sqlite`,
//! or [`MemoryStore`](crate::memory::MemoryStore) for tests). Everything in
//! this crate is written against it; no component holds a global client.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Record ──────────────────────────────────────────────────────────────────

/// One stored item, addressed by `(partition_key, sort_key)`.
///
/// `payload` is opaque to the store; see [`crate::record`] for the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  pub partition_key: String,
  pub sort_key:      String,
  pub expires_at:    DateTime<Utc>,
  pub created_at:    Option<DateTime<Utc>>,
  pub payload:       String,
}

impl Record {
  /// A record is live at `t` while its expiry lies strictly after `t`.
  pub fn is_live_at(&self, t: DateTime<Utc>) -> bool { self.expires_at > t }
}

// ─── Conditional writes ──────────────────────────────────────────────────────

/// Predicate evaluated atomically against the record currently stored under
/// the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
  /// Write unconditionally, replacing whatever is there.
  Always,
  /// Write only if no record exists or the existing one is no longer live at
  /// the given instant (`expires_at <= t`).
  AbsentOrExpiredAt(DateTime<Utc>),
}

impl Condition {
  /// Evaluate the predicate against `existing`. Backends that can run it
  /// inside their own critical section should use this directly.
  pub fn admits(&self, existing: Option<&Record>) -> bool {
    match self {
      Self::Always => true,
      Self::AbsentOrExpiredAt(t) => existing.is_none_or(|r| !r.is_live_at(*t)),
    }
  }
}

/// Result of a conditional put that reached the store.
///
/// Storage failures travel in the `Err` arm of the surrounding `Result`, so a
/// conflict can never be mistaken for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
  Written,
  /// The predicate failed. Carries the blocking record when the backend
  /// could observe it atomically; `None` means the caller must read it.
  Conflict(Option<Record>),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a keyed store with single-key conditional writes and
/// TTL-style expiry.
///
/// Reads are unconditional and return expired records that have not been
/// purged yet; deciding liveness is the caller's business.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait KeyedStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Write `record` if `condition` holds for the record stored under the
  /// same key. The check and the write are atomic.
  fn conditional_put(
    &self,
    record: Record,
    condition: Condition,
  ) -> impl Future<Output = Result<PutOutcome, Self::Error>> + Send + '_;

  /// Read one record. Returns `None` if the key is absent.
  fn get<'a>(
    &'a self,
    partition_key: &'a str,
    sort_key: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// Read every record under a partition, in no particular order.
  fn get_all<'a>(
    &'a self,
    partition_key: &'a str,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a;

  /// Delete records with `expires_at <= now` and return how many went.
  fn purge_expired(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
