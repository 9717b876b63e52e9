//! Correlation map: one report identity per alert identity and window.
//!
//! The first writer of a window wins a single-key compare-and-set; every
//! other caller in that window reads the winner's entry back and joins its
//! report. The window check is part of the write predicate, never a filter
//! applied afterwards.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
  Error, Result,
  alert::{AlertId, Report, ReportId, ReportStatus},
  clock::Clock,
  error::StoreOp,
  ident::IdGenerator,
  record::{self, CORRELATION_SORT_KEY, CorrelationPayload},
  store::{Condition, KeyedStore, PutOutcome, Record},
};

pub struct CorrelationMap<S> {
  store:  Arc<S>,
  ids:    Arc<dyn IdGenerator>,
  clock:  Arc<dyn Clock>,
  window: TimeDelta,
}

impl<S: KeyedStore> CorrelationMap<S> {
  pub fn new(
    store: Arc<S>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    window: TimeDelta,
  ) -> Self {
    Self { store, ids, clock, window }
  }

  /// Return the report for `alert_id` in the window containing `event_at`.
  ///
  /// `New` means this call opened the window; `More` means an entry still
  /// live at `event_at` already existed and its identity is returned. An
  /// entry whose expiry equals `event_at` is expired.
  pub async fn acquire_report(
    &self,
    alert_id: &AlertId,
    event_at: DateTime<Utc>,
  ) -> Result<Report> {
    let expires_at = record::expiry_after(event_at, self.window, "event timestamp")?;
    let candidate = ReportId::parse(&self.ids.next_id())?;
    let partition_key = record::correlation_partition(alert_id);
    let created_at = self.clock.now();

    let entry = Record {
      partition_key: partition_key.clone(),
      sort_key:      CORRELATION_SORT_KEY.to_owned(),
      expires_at,
      created_at:    Some(created_at),
      payload:       record::encode(&CorrelationPayload { report_id: candidate.clone() })?,
    };

    let outcome = self
      .store
      .conditional_put(entry, Condition::AbsentOrExpiredAt(event_at))
      .await
      .map_err(|e| {
        Error::store(StoreOp::ConditionalPut, &partition_key, Some(CORRELATION_SORT_KEY), e)
      })?;

    let existing = match outcome {
      PutOutcome::Written => {
        return Ok(Report { id: candidate, status: ReportStatus::New, created_at });
      }
      PutOutcome::Conflict(Some(existing)) => existing,
      PutOutcome::Conflict(None) => self.read_entry(&partition_key).await?,
    };

    joined_report(&existing)
  }

  async fn read_entry(&self, partition_key: &str) -> Result<Record> {
    self
      .store
      .get(partition_key, CORRELATION_SORT_KEY)
      .await
      .map_err(|e| Error::store(StoreOp::Get, partition_key, Some(CORRELATION_SORT_KEY), e))?
      .ok_or_else(|| Error::VanishedConflict {
        partition_key: partition_key.to_owned(),
        sort_key:      CORRELATION_SORT_KEY.to_owned(),
      })
  }
}

fn joined_report(existing: &Record) -> Result<Report> {
  let payload: CorrelationPayload = record::decode(existing)?;
  let created_at = existing.created_at.ok_or_else(|| Error::MissingField {
    partition_key: existing.partition_key.clone(),
    sort_key:      existing.sort_key.clone(),
    field:         "created_at",
  })?;
  Ok(Report { id: payload.report_id, status: ReportStatus::More, created_at })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::{clock::ManualClock, ident::SequenceGenerator, memory::MemoryStore};

  fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, h, m, 0).unwrap()
  }

  fn map(store: MemoryStore, clock: &ManualClock) -> CorrelationMap<MemoryStore> {
    CorrelationMap::new(
      Arc::new(store),
      Arc::new(SequenceGenerator::new("R")),
      Arc::new(clock.clone()),
      TimeDelta::hours(3),
    )
  }

  fn alert_id() -> AlertId { AlertId::parse("host-7:ruleA").unwrap() }

  #[tokio::test]
  async fn late_alert_joins_and_rollover_starts_new_window() {
    let clock = ManualClock::new(at(10, 0));
    let m = map(MemoryStore::new(), &clock);

    let first = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap();
    assert_eq!(first.status, ReportStatus::New);
    assert_eq!(first.id.as_str(), "R1");
    assert_eq!(first.created_at, at(10, 0));

    clock.set(at(11, 30));
    let second = m.acquire_report(&alert_id(), at(11, 30)).await.unwrap();
    assert_eq!(second, Report { id: first.id.clone(), status: ReportStatus::More, created_at: at(10, 0) });

    clock.set(at(13, 5));
    let third = m.acquire_report(&alert_id(), at(13, 5)).await.unwrap();
    assert_eq!(third.status, ReportStatus::New);
    assert_ne!(third.id, first.id);
    assert_eq!(third.created_at, at(13, 5));
  }

  #[tokio::test]
  async fn event_time_on_expiry_starts_new_window() {
    let clock = ManualClock::new(at(10, 0));
    let m = map(MemoryStore::new(), &clock);

    let first = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap();
    let boundary = m.acquire_report(&alert_id(), at(13, 0)).await.unwrap();
    assert_eq!(boundary.status, ReportStatus::New);
    assert_ne!(boundary.id, first.id);
  }

  #[tokio::test]
  async fn one_second_before_expiry_still_joins() {
    let clock = ManualClock::new(at(10, 0));
    let m = map(MemoryStore::new(), &clock);

    let first = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap();
    let joined = m
      .acquire_report(&alert_id(), at(13, 0) - TimeDelta::seconds(1))
      .await
      .unwrap();
    assert_eq!(joined.status, ReportStatus::More);
    assert_eq!(joined.id, first.id);
  }

  #[tokio::test]
  async fn window_is_judged_by_event_time_not_wall_clock() {
    // Wall clock is far past the window; the late alert's event time is not.
    let clock = ManualClock::new(at(10, 0));
    let m = map(MemoryStore::new(), &clock);
    let first = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap();

    clock.set(at(23, 0));
    let late = m.acquire_report(&alert_id(), at(10, 45)).await.unwrap();
    assert_eq!(late.status, ReportStatus::More);
    assert_eq!(late.id, first.id);
  }

  #[tokio::test]
  async fn read_back_path_returns_existing_entry() {
    let clock = ManualClock::new(at(10, 0));
    let m = map(MemoryStore::new().without_conflict_records(), &clock);

    let first = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap();
    let second = m.acquire_report(&alert_id(), at(10, 5)).await.unwrap();
    assert_eq!(second.status, ReportStatus::More);
    assert_eq!(second.id, first.id);
  }

  #[tokio::test]
  async fn different_alert_ids_are_independent() {
    let clock = ManualClock::new(at(10, 0));
    let m = map(MemoryStore::new(), &clock);
    let a = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap();
    let b = m
      .acquire_report(&AlertId::parse("host-8:ruleA").unwrap(), at(10, 0))
      .await
      .unwrap();
    assert!(a.is_new() && b.is_new());
    assert_ne!(a.id, b.id);
  }

  #[tokio::test]
  async fn event_time_at_end_of_range_is_rejected_before_writing() {
    let clock = ManualClock::new(at(10, 0));
    let store = MemoryStore::new();
    let m = map(store.clone(), &clock);

    let far = DateTime::<Utc>::MAX_UTC - TimeDelta::hours(1);
    let err = m.acquire_report(&alert_id(), far).await.unwrap_err();
    assert!(matches!(err, Error::MalformedInput { what: "event timestamp", .. }));
    assert!(!err.is_retryable());
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn storage_failure_is_surfaced_with_keys() {
    let clock = ManualClock::new(at(10, 0));
    let store = MemoryStore::new();
    store.set_unavailable(true);
    let m = map(store, &clock);

    let err = m.acquire_report(&alert_id(), at(10, 0)).await.unwrap_err();
    assert!(err.is_retryable());
    match err {
      Error::Store { op, partition_key, sort_key, .. } => {
        assert_eq!(op, StoreOp::ConditionalPut);
        assert_eq!(partition_key, "correlation/host-7:ruleA");
        assert_eq!(sort_key.as_deref(), Some(CORRELATION_SORT_KEY));
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
