//! Handler for `POST /alerts`.
//!
//! Correlates the alert into a report, archives it under that report and,
//! when a workflow is configured, starts an execution for the report.
//! Responds `201` when the alert opened a new report and `200` when it joined
//! a live one; the body is the [`Report`] either way.

use axum::{Json, extract::State, http::StatusCode};
use sift_core::{
  alert::{Alert, Report},
  store::KeyedStore,
  workflow::{ExecutionInput, WorkflowTrigger},
};

use crate::{ApiState, error::ApiError};

/// `POST /alerts` — body: [`Alert`].
pub async fn ingest<S, W>(
  State(state): State<ApiState<S, W>>,
  Json(alert): Json<Alert>,
) -> Result<(StatusCode, Json<Report>), ApiError>
where
  S: KeyedStore,
  W: WorkflowTrigger,
{
  let report = state.repo.take_report(&alert).await?;
  state.repo.save_alert(&report.id, &alert).await?;

  tracing::info!(
    report_id = %report.id,
    status = ?report.status,
    detector = %alert.detector,
    rule_id = %alert.rule_id,
    "alert correlated"
  );

  if let Some(workflow) = &state.workflow {
    workflow
      .trigger
      .start(&workflow.target, &ExecutionInput::from(&report))
      .await
      .map_err(|e| ApiError::Trigger(Box::new(e)))?;
  }

  let status = if report.is_new() { StatusCode::CREATED } else { StatusCode::OK };
  Ok((status, Json(report)))
}
