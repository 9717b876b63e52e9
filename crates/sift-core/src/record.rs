//! Key layout and payload codec for the four record kinds.
//!
//! | Entity | Partition key | Sort key |
//! |--------|---------------|----------|
//! | correlation entry | `correlation/{alert_id}` | `fixed` |
//! | alert snapshot | `alertlog/{report_id}` | `{token}` |
//! | attribute admission | `attrgate/{report_id}` | `{attribute_hash}` |
//! | report section | `sectionlog/{report_id}` | `{attribute_hash}/{token}` |
//!
//! Payloads are compact JSON.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
  Error, Result,
  alert::{AlertId, Attribute, ReportId},
  store::Record,
};

/// Sort key of the single correlation entry in each partition.
pub const CORRELATION_SORT_KEY: &str = "fixed";

// ─── Keys ────────────────────────────────────────────────────────────────────

pub fn correlation_partition(alert_id: &AlertId) -> String {
  format!("correlation/{alert_id}")
}

pub fn admission_partition(report_id: &ReportId) -> String {
  format!("attrgate/{report_id}")
}

/// The two append-only logs kept per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
  AlertSnapshot,
  ReportSection,
}

impl LogKind {
  pub fn prefix(self) -> &'static str {
    match self {
      Self::AlertSnapshot => "alertlog",
      Self::ReportSection => "sectionlog",
    }
  }

  pub fn partition(self, report_id: &ReportId) -> String {
    format!("{}/{report_id}", self.prefix())
  }
}

/// Sort key for a report section: groups by attribute, unique per write.
pub fn section_sort_key(attribute_hash: &str, token: &str) -> String {
  format!("{attribute_hash}/{token}")
}

/// `from + ttl`, or [`Error::MalformedInput`] naming `what` when the sum
/// falls outside the representable range.
pub fn expiry_after(
  from: DateTime<Utc>,
  ttl: TimeDelta,
  what: &'static str,
) -> Result<DateTime<Utc>> {
  from
    .checked_add_signed(ttl)
    .ok_or_else(|| Error::MalformedInput { what, value: from.to_rfc3339() })
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Payload of a correlation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationPayload {
  pub report_id: ReportId,
}

/// Payload of an attribute admission: the attribute's fields, kept for
/// inspection by operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionPayload {
  pub attr_key:    String,
  pub attr_type:   String,
  pub attr_value:  String,
  pub observed_at: DateTime<Utc>,
}

impl AdmissionPayload {
  pub fn new(attribute: &Attribute, observed_at: DateTime<Utc>) -> Self {
    Self {
      attr_key:   attribute.key.clone(),
      attr_type:  attribute.attr_type.clone(),
      attr_value: attribute.value.clone(),
      observed_at,
    }
  }
}

// ─── Codec ───────────────────────────────────────────────────────────────────

pub fn encode<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

/// Decode a record's payload, naming the record on failure.
pub fn decode<T: DeserializeOwned>(record: &Record) -> Result<T> {
  serde_json::from_str(&record.payload).map_err(|source| Error::Decode {
    partition_key: record.partition_key.clone(),
    sort_key:      record.sort_key.clone(),
    source,
  })
}
