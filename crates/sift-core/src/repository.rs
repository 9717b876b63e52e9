//! [`Repository`] — one handle over the correlation map, the attribute gate
//! and both logs, all sharing a store, a clock and an id generator.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  alert::{Alert, Attribute, Report, ReportId, ReportSection},
  clock::{Clock, SystemClock},
  correlation::CorrelationMap,
  error::StoreOp,
  gate::AttributeGate,
  ident::{IdGenerator, UuidGenerator},
  log::{AlertLog, SectionLog},
  record::AdmissionPayload,
  settings::Settings,
  store::KeyedStore,
};

pub struct Repository<S> {
  store:        Arc<S>,
  clock:        Arc<dyn Clock>,
  correlations: CorrelationMap<S>,
  gate:         AttributeGate<S>,
  alerts:       AlertLog<S>,
  sections:     SectionLog<S>,
}

impl<S: KeyedStore> Repository<S> {
  /// Build a repository using the system clock and random UUIDs.
  pub fn new(store: Arc<S>, settings: &Settings) -> Self {
    Self::with_parts(store, settings, Arc::new(SystemClock), Arc::new(UuidGenerator))
  }

  pub fn with_parts(
    store: Arc<S>,
    settings: &Settings,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
  ) -> Self {
    Self {
      correlations: CorrelationMap::new(
        store.clone(),
        ids.clone(),
        clock.clone(),
        settings.correlation_window(),
      ),
      gate: AttributeGate::new(store.clone(), clock.clone(), settings.attribute_ttl()),
      alerts: AlertLog::new(store.clone(), ids.clone(), clock.clone(), settings.alert_ttl()),
      sections: SectionLog::new(store.clone(), ids, clock.clone(), settings.section_ttl()),
      store,
      clock,
    }
  }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// Find or open the report `alert` belongs to.
  pub async fn take_report(&self, alert: &Alert) -> Result<Report> {
    self.correlations.acquire_report(&alert.alert_id(), alert.timestamp).await
  }

  pub async fn save_alert(&self, report_id: &ReportId, alert: &Alert) -> Result<String> {
    self.alerts.append_alert(report_id, alert).await
  }

  pub async fn fetch_alerts(&self, report_id: &ReportId) -> Result<Vec<Alert>> {
    self.alerts.fetch_all(report_id).await
  }

  // ── Attributes ────────────────────────────────────────────────────────────

  /// `true` if the caller should inspect `attribute`.
  pub async fn admit_attribute(&self, report_id: &ReportId, attribute: &Attribute) -> Result<bool> {
    self.gate.admit(report_id, attribute).await
  }

  pub async fn fetch_admissions(&self, report_id: &ReportId) -> Result<Vec<AdmissionPayload>> {
    self.gate.fetch_all(report_id).await
  }

  // ── Sections ──────────────────────────────────────────────────────────────

  pub async fn save_section(&self, section: &ReportSection) -> Result<String> {
    self.sections.append_section(section).await
  }

  pub async fn fetch_sections(&self, report_id: &ReportId) -> Result<Vec<ReportSection>> {
    self.sections.fetch_all(report_id).await
  }

  // ── Housekeeping ──────────────────────────────────────────────────────────

  /// Drop every record that is expired as of now.
  pub async fn purge_expired(&self) -> Result<usize> {
    self
      .store
      .purge_expired(self.clock.now())
      .await
      .map_err(|e| Error::store(StoreOp::PurgeExpired, "*", None, e))
  }
}
