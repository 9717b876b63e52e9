//! In-memory [`KeyedStore`] with real predicate evaluation.
//!
//! Each partition is an ordered map of sort key to record; the predicate of a
//! conditional put is evaluated under the same lock as the write, which gives
//! the same atomicity a real backend provides for a single key.

use std::{
  collections::{BTreeMap, HashMap},
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::{Condition, KeyedStore, PutOutcome, Record};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  /// Simulated outage; see [`MemoryStore::set_unavailable`].
  #[error("store unavailable")]
  Unavailable,
}

type Partitions = HashMap<String, BTreeMap<String, Record>>;

/// Cloning is cheap and clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  data:               Arc<Mutex<Partitions>>,
  unavailable:        Arc<AtomicBool>,
  hide_conflict_body: bool,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Report conflicts as `Conflict(None)`, like a backend that cannot return
  /// the blocking record, forcing callers through their read-back path.
  pub fn without_conflict_records(mut self) -> Self {
    self.hide_conflict_body = true;
    self
  }

  /// While set, every operation fails with [`MemoryStoreError::Unavailable`].
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  /// Total number of records, expired or not.
  pub fn len(&self) -> usize {
    self.lock().values().map(BTreeMap::len).sum()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn lock(&self) -> MutexGuard<'_, Partitions> {
    self.data.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn check_available(&self) -> Result<(), MemoryStoreError> {
    if self.unavailable.load(Ordering::SeqCst) {
      return Err(MemoryStoreError::Unavailable);
    }
    Ok(())
  }
}

impl KeyedStore for MemoryStore {
  type Error = MemoryStoreError;

  async fn conditional_put(
    &self,
    record: Record,
    condition: Condition,
  ) -> Result<PutOutcome, MemoryStoreError> {
    self.check_available()?;
    let mut data = self.lock();
    let partition = data.entry(record.partition_key.clone()).or_default();
    let existing = partition.get(&record.sort_key);

    if !condition.admits(existing) {
      let body = if self.hide_conflict_body { None } else { existing.cloned() };
      return Ok(PutOutcome::Conflict(body));
    }

    partition.insert(record.sort_key.clone(), record);
    Ok(PutOutcome::Written)
  }

  async fn get(
    &self,
    partition_key: &str,
    sort_key: &str,
  ) -> Result<Option<Record>, MemoryStoreError> {
    self.check_available()?;
    Ok(
      self
        .lock()
        .get(partition_key)
        .and_then(|p| p.get(sort_key))
        .cloned(),
    )
  }

  async fn get_all(&self, partition_key: &str) -> Result<Vec<Record>, MemoryStoreError> {
    self.check_available()?;
    Ok(
      self
        .lock()
        .get(partition_key)
        .map(|p| p.values().cloned().collect())
        .unwrap_or_default(),
    )
  }

  async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, MemoryStoreError> {
    self.check_available()?;
    let mut data = self.lock();
    let mut purged = 0;
    for partition in data.values_mut() {
      let before = partition.len();
      partition.retain(|_, r| r.is_live_at(now));
      purged += before - partition.len();
    }
    data.retain(|_, p| !p.is_empty());
    Ok(purged)
  }
}
