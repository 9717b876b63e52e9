//! [`HttpTrigger`] — starts workflow executions by POSTing to an HTTP
//! endpoint.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use sift_core::workflow::{ExecutionInput, StateMachineArn, WorkflowTrigger};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
  #[error("workflow request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("workflow endpoint answered {status}: {body}")]
  Rejected { status: StatusCode, body: String },
}

/// Request body sent to the workflow endpoint.
#[derive(Debug, Serialize)]
struct StartExecution<'a> {
  state_machine_arn: &'a str,
  region:            &'a str,
  input:             &'a ExecutionInput,
}

/// Clones share the inner [`reqwest::Client`].
#[derive(Clone)]
pub struct HttpTrigger {
  client:   Client,
  endpoint: String,
}

impl HttpTrigger {
  pub fn new(endpoint: impl Into<String>) -> Result<Self, TriggerError> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, endpoint: endpoint.into() })
  }
}

impl WorkflowTrigger for HttpTrigger {
  type Error = TriggerError;

  async fn start(
    &self,
    target: &StateMachineArn,
    input: &ExecutionInput,
  ) -> Result<(), TriggerError> {
    let body = StartExecution {
      state_machine_arn: target.as_str(),
      region: target.region(),
      input,
    };

    let resp = self.client.post(&self.endpoint).json(&body).send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(TriggerError::Rejected { status, body });
    }

    tracing::debug!(arn = %target, report_id = %input.report_id, "workflow started");
    Ok(())
  }
}
