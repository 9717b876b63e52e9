//! Attribute dedup gate: each attribute of a report is inspected at most once
//! per TTL.

use std::sync::Arc;

use chrono::TimeDelta;

use crate::{
  Error, Result,
  alert::{Attribute, ReportId},
  clock::Clock,
  error::StoreOp,
  record::{self, AdmissionPayload},
  store::{Condition, KeyedStore, PutOutcome, Record},
};

pub struct AttributeGate<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
  ttl:   TimeDelta,
}

impl<S: KeyedStore> AttributeGate<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, ttl: TimeDelta) -> Self {
    Self { store, clock, ttl }
  }

  /// Returns `true` if this call admitted the attribute, i.e. the caller
  /// should go on to inspect it. `false` means another call already did.
  ///
  /// Storage failures are returned as errors; they never default to either
  /// answer.
  pub async fn admit(&self, report_id: &ReportId, attribute: &Attribute) -> Result<bool> {
    let now = self.clock.now();
    let partition_key = record::admission_partition(report_id);
    let sort_key = attribute.hash();
    let observed_at = attribute.timestamp.unwrap_or(now);
    let expires_at = record::expiry_after(now, self.ttl, "admission time")?;

    let entry = Record {
      partition_key: partition_key.clone(),
      sort_key:      sort_key.clone(),
      expires_at,
      created_at:    Some(now),
      payload:       record::encode(&AdmissionPayload::new(attribute, observed_at))?,
    };

    let outcome = self
      .store
      .conditional_put(entry, Condition::AbsentOrExpiredAt(now))
      .await
      .map_err(|e| Error::store(StoreOp::ConditionalPut, &partition_key, Some(&sort_key), e))?;

    Ok(matches!(outcome, PutOutcome::Written))
  }

  /// Every admission still in force for `report_id`, in no particular order.
  ///
  /// One undecodable record fails the whole fetch.
  pub async fn fetch_all(&self, report_id: &ReportId) -> Result<Vec<AdmissionPayload>> {
    let partition_key = record::admission_partition(report_id);
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
}
