//! The contract between the store and the workflow that processes a report.
//!
//! Once an alert has a report, the caller starts a workflow execution with
//! [`ExecutionInput`]. This crate never starts one itself; it only validates
//! the target and shapes the input.

use std::{
  fmt,
  future::Future,
  str::FromStr,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  alert::{Report, ReportId, ReportStatus},
};

// ─── Target ──────────────────────────────────────────────────────────────────

/// A state machine ARN:
/// `arn:{partition}:states:{region}:{account}:stateMachine:{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMachineArn {
  raw:     String,
  region:  String,
  account: String,
  name:    String,
}

impl StateMachineArn {
  pub fn parse(s: &str) -> Result<Self> {
    let malformed = || Error::MalformedInput { what: "state machine arn", value: s.to_owned() };

    let parts: Vec<&str> = s.split(':').collect();
    let [prefix, partition, service, region, account, kind, name] = parts[..] else {
      return Err(malformed());
    };
    if prefix != "arn"
      || partition.is_empty()
      || service != "states"
      || region.is_empty()
      || account.is_empty()
      || kind != "stateMachine"
      || name.is_empty()
    {
      return Err(malformed());
    }

    Ok(Self {
      raw:     s.to_owned(),
      region:  region.to_owned(),
      account: account.to_owned(),
      name:    name.to_owned(),
    })
  }

  pub fn region(&self) -> &str { &self.region }

  pub fn account(&self) -> &str { &self.account }

  pub fn name(&self) -> &str { &self.name }

  pub fn as_str(&self) -> &str { &self.raw }
}

impl fmt::Display for StateMachineArn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}

impl FromStr for StateMachineArn {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// JSON input of a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInput {
  pub report_id:  ReportId,
  pub status:     ReportStatus,
  pub created_at: DateTime<Utc>,
}

impl From<&Report> for ExecutionInput {
  fn from(report: &Report) -> Self {
    Self {
      report_id:  report.id.clone(),
      status:     report.status,
      created_at: report.created_at,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Starts a workflow execution for a report.
pub trait WorkflowTrigger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn start<'a>(
    &'a self,
    target: &'a StateMachineArn,
    input: &'a ExecutionInput,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Keeps every start request in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecordingTrigger {
  started: Arc<Mutex<Vec<(StateMachineArn, ExecutionInput)>>>,
}

impl RecordingTrigger {
  pub fn new() -> Self { Self::default() }

  pub fn started(&self) -> Vec<(StateMachineArn, ExecutionInput)> {
    self.started.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }
}

impl WorkflowTrigger for RecordingTrigger {
  type Error = std::convert::Infallible;

  async fn start(
    &self,
    target: &StateMachineArn,
    input: &ExecutionInput,
  ) -> Result<(), Self::Error> {
    self
      .started
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push((target.clone(), input.clone()));
    Ok(())
  }
}
