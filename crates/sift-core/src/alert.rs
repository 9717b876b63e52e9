//! Alert, attribute and report types.
//!
//! An alert arrives from a monitoring source and carries attributes (IP
//! addresses, domains, user names …). Alerts with the same [`AlertId`] inside
//! one correlation window share a [`ReportId`]; inspector output for the
//! report's attributes is recorded as [`ReportSection`]s.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Reject identifiers that cannot be embedded in a partition key.
fn validate_key_segment(what: &'static str, value: &str) -> Result<()> {
  if value.is_empty() || value.contains('/') || value.trim() != value {
    return Err(Error::MalformedInput { what, value: value.to_owned() });
  }
  Ok(())
}

/// Stable identity of a logical incident, derived from the alert's
/// source, rule and key fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlertId(String);

impl AlertId {
  pub fn parse(s: &str) -> Result<Self> {
    validate_key_segment("alert id", s)?;
    Ok(Self(s.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// Unique token identifying one correlated incident window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportId(String);

impl ReportId {
  pub fn parse(s: &str) -> Result<Self> {
    validate_key_segment("report id", s)?;
    Ok(Self(s.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

macro_rules! string_newtype_impls {
  ($ty:ident) => {
    impl fmt::Display for $ty {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl TryFrom<String> for $ty {
      type Error = Error;

      fn try_from(s: String) -> Result<Self> { Self::parse(&s) }
    }

    impl From<$ty> for String {
      fn from(id: $ty) -> Self { id.0 }
    }

    impl std::str::FromStr for $ty {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
    }
  };
}

string_newtype_impls!(AlertId);
string_newtype_impls!(ReportId);

// ─── Report ──────────────────────────────────────────────────────────────────

/// Whether an alert opened a new report or joined a live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
  New,
  More,
}

/// The answer to "which report does this alert belong to".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  pub id:         ReportId,
  pub status:     ReportStatus,
  /// When the report's correlation entry was first written.
  pub created_at: DateTime<Utc>,
}

impl Report {
  pub fn is_new(&self) -> bool { self.status == ReportStatus::New }
}

// ─── Attribute ───────────────────────────────────────────────────────────────

/// A value observed in an alert, e.g. `{key: "src", type: "ipaddr", value:
/// "10.0.0.1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
  pub key:       String,
  #[serde(rename = "type")]
  pub attr_type: String,
  pub value:     String,
  /// Free-form hints for inspectors ("remote", "subject" …).
  #[serde(default)]
  pub context:   Vec<String>,
  /// When the attribute was observed; `None` means "at ingestion time".
  #[serde(default)]
  pub timestamp: Option<DateTime<Utc>>,
}

impl Attribute {
  pub fn new(
    key: impl Into<String>,
    attr_type: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    Self {
      key:       key.into(),
      attr_type: attr_type.into(),
      value:     value.into(),
      context:   Vec::new(),
      timestamp: None,
    }
  }

  /// Deterministic fingerprint over key, type and value.
  ///
  /// Observation time and context are excluded so the same attribute seen at
  /// different moments dedups. Each field is length-prefixed, so no two
  /// distinct triples share an input.
  pub fn hash(&self) -> String {
    let mut hasher = Sha256::new();
    for field in [&self.key, &self.attr_type, &self.value] {
      hasher.update((field.len() as u64).to_be_bytes());
      hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

/// An alert as delivered by a monitoring source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  /// The product or pipeline that raised the alert.
  pub detector:    String,
  pub rule_id:     String,
  #[serde(default)]
  pub rule_name:   String,
  /// Source-chosen key grouping repeated alerts, e.g. a host name.
  pub alert_key:   String,
  #[serde(default)]
  pub description: String,
  /// Event time, not arrival time.
  pub timestamp:   DateTime<Utc>,
  #[serde(default)]
  pub attributes:  Vec<Attribute>,
  #[serde(default)]
  pub body:        serde_json::Value,
}

impl Alert {
  /// Correlation identity: hex SHA-256 of detector, rule id and alert key.
  pub fn alert_id(&self) -> AlertId {
    let joined = ["v0", &self.detector, &self.rule_id, &self.alert_key].join("|");
    AlertId(hex::encode(Sha256::digest(joined.as_bytes())))
  }
}

// ─── ReportSection ───────────────────────────────────────────────────────────

/// One inspector's findings about one attribute of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
  pub report_id: ReportId,
  pub attribute: Attribute,
  /// Name of the inspector that produced the content.
  pub author:    String,
  #[serde(default)]
  pub content:   serde_json::Value,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn alert(detector: &str, rule: &str, key: &str) -> Alert {
    Alert {
      detector:    detector.into(),
      rule_id:     rule.into(),
      rule_name:   String::new(),
      alert_key:   key.into(),
      description: String::new(),
      timestamp:   Utc::now(),
      attributes:  vec![],
      body:        serde_json::Value::Null,
    }
  }

  #[test]
  fn alert_id_ignores_non_identity_fields() {
    let mut a = alert("ids", "ruleA", "host-7");
    let b = alert("ids", "ruleA", "host-7");
    a.description = "something else".into();
    a.attributes.push(Attribute::new("ip", "ipv4", "1.2.3.4"));
    assert_eq!(a.alert_id(), b.alert_id());
    assert_ne!(a.alert_id(), alert("ids", "ruleB", "host-7").alert_id());
  }

  #[test]
  fn attribute_hash_ignores_time_and_context() {
    let a = Attribute::new("ip", "ipv4", "1.2.3.4");
    let mut b = a.clone();
    b.timestamp = Some(Utc::now());
    b.context.push("remote".into());
    assert_eq!(a.hash(), b.hash());
    assert_ne!(a.hash(), Attribute::new("ip", "ipv4", "5.6.7.8").hash());
  }

  #[test]
  fn attribute_hash_respects_field_boundaries() {
    let a = Attribute::new("ab", "c", "d");
    let b = Attribute::new("a", "bc", "d");
    assert_ne!(a.hash(), b.hash());
  }

  #[test]
  fn ids_reject_unembeddable_values() {
    assert!(ReportId::parse("").is_err());
    assert!(ReportId::parse("a/b").is_err());
    assert!(ReportId::parse(" r1").is_err());
    assert!(AlertId::parse("host-7:ruleA").is_ok());
  }

  #[test]
  fn report_id_deserialization_validates() {
    let bad: std::result::Result<ReportId, _> = serde_json::from_str("\"x/y\"");
    assert!(bad.is_err());
    let good: ReportId = serde_json::from_str("\"r-1\"").unwrap();
    assert_eq!(good.as_str(), "r-1");
  }

  #[test]
  fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ReportStatus::More).unwrap(), "\"more\"");
  }
}
