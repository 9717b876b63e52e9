//! Append-only logs scoped to a report.
//!
//! Two instances exist: alert snapshots and report sections. Entries are
//! written unconditionally under a fresh sub-key, are never updated, and are
//! read back as an unordered set. Duplicates are acceptable here.

use std::{marker::PhantomData, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
  Error, Result,
  alert::{Alert, ReportId, ReportSection},
  clock::Clock,
  error::StoreOp,
  ident::IdGenerator,
  record::{self, LogKind},
  store::{Condition, KeyedStore, Record},
};

/// A type that can be stored in an [`AppendLog`].
pub trait LogEntry: Serialize + DeserializeOwned + Send + Sync {
  const KIND: LogKind;
}

impl LogEntry for Alert {
  const KIND: LogKind = LogKind::AlertSnapshot;
}

impl LogEntry for ReportSection {
  const KIND: LogKind = LogKind::ReportSection;
}

pub type AlertLog<S> = AppendLog<Alert, S>;
pub type SectionLog<S> = AppendLog<ReportSection, S>;

pub struct AppendLog<T, S> {
  store:  Arc<S>,
  ids:    Arc<dyn IdGenerator>,
  clock:  Arc<dyn Clock>,
  ttl:    TimeDelta,
  _entry: PhantomData<fn() -> T>,
}

impl<T: LogEntry, S: KeyedStore> AppendLog<T, S> {
  pub fn new(
    store: Arc<S>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
  ) -> Self {
    Self { store, ids, clock, ttl, _entry: PhantomData }
  }

  /// Write `entry` under `{kind}/{report_id}` with sort key `sub_key`.
  ///
  /// `sub_key` must be unique per call; an existing record under the same
  /// key is overwritten.
  pub async fn append(
    &self,
    report_id: &ReportId,
    sub_key: String,
    expires_at: DateTime<Utc>,
    entry: &T,
  ) -> Result<String> {
    let partition_key = T::KIND.partition(report_id);
    let record = Record {
      partition_key: partition_key.clone(),
      sort_key:      sub_key.clone(),
      expires_at,
      created_at:    Some(self.clock.now()),
      payload:       record::encode(entry)?,
    };

    // An unconditional put cannot conflict.
    self
      .store
      .conditional_put(record, Condition::Always)
      .await
      .map_err(|e| Error::store(StoreOp::ConditionalPut, &partition_key, Some(&sub_key), e))?;

    Ok(sub_key)
  }

  /// Every unexpired entry for `report_id`, in no particular order.
  ///
  /// One undecodable record fails the whole fetch. An empty log is `Ok`.
  pub async fn fetch_all(&self, report_id: &ReportId) -> Result<Vec<T>> {
    let partition_key = T::KIND.partition(report_id);
    let now = self.clock.now();

    let records = self
      .store
      .get_all(&partition_key)
      .await
      .map_err(|e| Error::store(StoreOp::GetAll, &partition_key, None, e))?;

    records
      .iter()
      .filter(|r| r.is_live_at(now))
      .map(record::decode)
      .collect()
  }

  fn token(&self) -> String { self.ids.next_id() }
}

impl<S: KeyedStore> AppendLog<Alert, S> {
  /// Archive an alert under its report. Expiry counts from the alert's event
  /// time.
  pub async fn append_alert(&self, report_id: &ReportId, alert: &Alert) -> Result<String> {
    let expires_at = record::expiry_after(alert.timestamp, self.ttl, "event timestamp")?;
    self.append(report_id, self.token(), expires_at, alert).await
  }
}

impl<S: KeyedStore> AppendLog<ReportSection, S> {
  /// Record an inspector result under `section.report_id`, grouped by the
  /// attribute's hash. Expiry counts from now.
  pub async fn append_section(&self, section: &ReportSection) -> Result<String> {
    let sub_key = record::section_sort_key(&section.attribute.hash(), &self.token());
    let expires_at = record::expiry_after(self.clock.now(), self.ttl, "section time")?;
    self.append(&section.report_id, sub_key, expires_at, section).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;
  use crate::{
    alert::Attribute, clock::ManualClock, ident::UuidGenerator, memory::MemoryStore,
  };

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap() }

  fn log<T: LogEntry>(store: &MemoryStore, clock: &ManualClock, ttl: TimeDelta) -> AppendLog<T, MemoryStore> {
    AppendLog::new(
      Arc::new(store.clone()),
      Arc::new(UuidGenerator),
      Arc::new(clock.clone()),
      ttl,
    )
  }

  fn alert(n: usize) -> Alert {
    Alert {
      detector:    "ids".into(),
      rule_id:     "ruleA".into(),
      rule_name:   "Rule A".into(),
      alert_key:   "host-7".into(),
      description: format!("alert #{n}"),
      timestamp:   now(),
      attributes:  vec![Attribute::new("ip", "ipv4", "1.2.3.4")],
      body:        json!({ "n": n }),
    }
  }

  fn section(report: &ReportId, value: &str) -> ReportSection {
    ReportSection {
      report_id: report.clone(),
      attribute: Attribute::new("ip", "ipv4", value),
      author:    "geoip".into(),
      content:   json!({ "country": "NL" }),
    }
  }

  #[tokio::test]
  async fn empty_log_is_not_an_error() {
    let clock = ManualClock::new(now());
    let alerts: AlertLog<_> = log(&MemoryStore::new(), &clock, TimeDelta::hours(3));
    let fetched = alerts.fetch_all(&ReportId::parse("R1").unwrap()).await.unwrap();
    assert!(fetched.is_empty());
  }

  #[tokio::test]
  async fn appended_alerts_accumulate_and_refetch_identically() {
    let clock = ManualClock::new(now());
    let alerts: AlertLog<_> = log(&MemoryStore::new(), &clock, TimeDelta::hours(3));
    let r1 = ReportId::parse("R1").unwrap();

    for n in 0..5 {
      alerts.append_alert(&r1, &alert(n)).await.unwrap();
    }
    // Identical payloads are not deduplicated.
    alerts.append_alert(&r1, &alert(0)).await.unwrap();

    let mut first: Vec<_> = alerts.fetch_all(&r1).await.unwrap();
    let mut second: Vec<_> = alerts.fetch_all(&r1).await.unwrap();
    assert_eq!(first.len(), 6);
    first.sort_by(|a, b| a.description.cmp(&b.description));
    second.sort_by(|a, b| a.description.cmp(&b.description));
    assert_eq!(first, second);
  }

  #[tokio::test]
  async fn logs_are_scoped_to_report_and_kind() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let alerts: AlertLog<_> = log(&store, &clock, TimeDelta::hours(3));
    let sections: SectionLog<_> = log(&store, &clock, TimeDelta::hours(24));
    let r1 = ReportId::parse("R1").unwrap();
    let r2 = ReportId::parse("R2").unwrap();

    alerts.append_alert(&r1, &alert(1)).await.unwrap();
    sections.append_section(&section(&r1, "1.2.3.4")).await.unwrap();
    sections.append_section(&section(&r2, "1.2.3.4")).await.unwrap();

    assert_eq!(alerts.fetch_all(&r1).await.unwrap().len(), 1);
    assert!(alerts.fetch_all(&r2).await.unwrap().is_empty());
    assert_eq!(sections.fetch_all(&r1).await.unwrap().len(), 1);
    assert_eq!(sections.fetch_all(&r2).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn section_sub_keys_group_by_attribute_hash() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let sections: SectionLog<_> = log(&store, &clock, TimeDelta::hours(24));
    let r1 = ReportId::parse("R1").unwrap();
    let s = section(&r1, "1.2.3.4");

    let a = sections.append_section(&s).await.unwrap();
    let b = sections.append_section(&s).await.unwrap();
    let prefix = format!("{}/", s.attribute.hash());
    assert!(a.starts_with(&prefix) && b.starts_with(&prefix));
    assert_ne!(a, b);
    assert_eq!(sections.fetch_all(&r1).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn expired_entries_are_not_returned() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let sections: SectionLog<_> = log(&store, &clock, TimeDelta::hours(24));
    let r1 = ReportId::parse("R1").unwrap();

    sections.append_section(&section(&r1, "1.2.3.4")).await.unwrap();
    clock.advance(TimeDelta::hours(12));
    sections.append_section(&section(&r1, "5.6.7.8")).await.unwrap();
    clock.advance(TimeDelta::hours(12));

    let live = sections.fetch_all(&r1).await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].attribute.value, "5.6.7.8");
  }

  #[tokio::test]
  async fn one_corrupt_record_fails_the_fetch() {
    let clock = ManualClock::new(now());
    let store = MemoryStore::new();
    let alerts: AlertLog<_> = log(&store, &clock, TimeDelta::hours(3));
    let r1 = ReportId::parse("R1").unwrap();
    alerts.append_alert(&r1, &alert(1)).await.unwrap();

    let corrupt = Record {
      partition_key: LogKind::AlertSnapshot.partition(&r1),
      sort_key:      "broken".into(),
      expires_at:    now() + TimeDelta::hours(3),
      created_at:    None,
      payload:       "{\"detector\":".into(),
    };
    store.conditional_put(corrupt, Condition::Always).await.unwrap();

    match alerts.fetch_all(&r1).await.unwrap_err() {
      Error::Decode { sort_key, .. } => assert_eq!(sort_key, "broken"),
      other => panic!("unexpected error: {other}"),
    }
  }
}
