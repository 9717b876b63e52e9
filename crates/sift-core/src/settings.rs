//! Window and TTL settings shared by every component.

use chrono::TimeDelta;
use serde::Deserialize;

/// Durations are whole seconds so they deserialise straight from TOML or
/// environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// How long after an alert's event time later alerts join its report.
  pub correlation_window_secs: u32,
  /// How long an admitted attribute blocks re-inspection.
  pub attribute_ttl_secs:      u32,
  /// Alert snapshots live this long past the alert's event time.
  pub alert_ttl_secs:          u32,
  /// Report sections live this long past the moment they were written.
  pub section_ttl_secs:        u32,
}

const HOUR: u32 = 60 * 60;

impl Default for Settings {
  fn default() -> Self {
    Self {
      correlation_window_secs: 3 * HOUR,
      attribute_ttl_secs:      3 * HOUR,
      alert_ttl_secs:          3 * HOUR,
      section_ttl_secs:        24 * HOUR,
    }
  }
}

impl Settings {
  pub fn correlation_window(&self) -> TimeDelta {
    TimeDelta::seconds(i64::from(self.correlation_window_secs))
  }

  pub fn attribute_ttl(&self) -> TimeDelta {
    TimeDelta::seconds(i64::from(self.attribute_ttl_secs))
  }

  pub fn alert_ttl(&self) -> TimeDelta {
    TimeDelta::seconds(i64::from(self.alert_ttl_secs))
  }

  pub fn section_ttl(&self) -> TimeDelta {
    TimeDelta::seconds(i64::from(self.section_ttl_secs))
  }
}
