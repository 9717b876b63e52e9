//! Handlers for `/reports/{id}/…` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports/:id/alerts` | Every archived alert, unordered |
//! | `GET`  | `/reports/:id/attributes` | Every admission still in force, unordered |
//! | `POST` | `/reports/:id/attributes` | Body: [`Attribute`]; `{"admitted": bool, "hash": "…"}` |
//! | `GET`  | `/reports/:id/sections` | Every recorded section, unordered |
//! | `POST` | `/reports/:id/sections` | Body: [`NewSectionBody`]; returns 201 |
//!
//! A malformed `:id` is rejected with 400 before the store is touched.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::{Deserialize, Serialize};
use sift_core::{
  alert::{Alert, Attribute, ReportId, ReportSection},
  record::AdmissionPayload,
  store::KeyedStore,
  workflow::WorkflowTrigger,
};

use crate::{ApiState, error::ApiError};

fn parse_report_id(raw: &str) -> Result<ReportId, ApiError> {
  ReportId::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ─── Alerts ───────────────────────────────────────────────────────────────────

/// `GET /reports/:id/alerts`
pub async fn list_alerts<S, W>(
  State(state): State<ApiState<S, W>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Alert>>, ApiError>
where
  S: KeyedStore,
  W: WorkflowTrigger,
{
  let report_id = parse_report_id(&id)?;
  Ok(Json(state.repo.fetch_alerts(&report_id).await?))
}

// ─── Attributes ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Admission {
  /// `true` if the caller should inspect the attribute.
  pub admitted: bool,
  pub hash:     String,
}

/// `POST /reports/:id/attributes` — body: [`Attribute`].
pub async fn admit<S, W>(
  State(state): State<ApiState<S, W>>,
  Path(id): Path<String>,
  Json(attribute): Json<Attribute>,
) -> Result<Json<Admission>, ApiError>
where
  S: KeyedStore,
  W: WorkflowTrigger,
{
  let report_id = parse_report_id(&id)?;
  let admitted = state.repo.admit_attribute(&report_id, &attribute).await?;
  let hash = attribute.hash();

  tracing::debug!(report_id = %report_id, %hash, admitted, "attribute offered");
  Ok(Json(Admission { admitted, hash }))
}

/// `GET /reports/:id/attributes`
pub async fn list_admissions<S, W>(
  State(state): State<ApiState<S, W>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<AdmissionPayload>>, ApiError>
where
  S: KeyedStore,
  W: WorkflowTrigger,
{
  let report_id = parse_report_id(&id)?;
  Ok(Json(state.repo.fetch_admissions(&report_id).await?))
}

// ─── Sections ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /reports/:id/sections`. The report id comes
/// from the path.
#[derive(Debug, Deserialize)]
pub struct NewSectionBody {
  pub attribute: Attribute,
  pub author:    String,
  #[serde(default)]
  pub content:   serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SectionReceipt {
  pub sort_key: String,
}

/// `POST /reports/:id/sections` — returns 201 + the entry's sort key.
pub async fn add_section<S, W>(
  State(state): State<ApiState<S, W>>,
  Path(id): Path<String>,
  Json(body): Json<NewSectionBody>,
) -> Result<(StatusCode, Json<SectionReceipt>), ApiError>
where
  S: KeyedStore,
  W: WorkflowTrigger,
{
  let section = ReportSection {
    report_id: parse_report_id(&id)?,
    attribute: body.attribute,
    author:    body.author,
    content:   body.content,
  };
  let sort_key = state.repo.save_section(&section).await?;

  tracing::debug!(report_id = %section.report_id, author = %section.author, "section recorded");
  Ok((StatusCode::CREATED, Json(SectionReceipt { sort_key })))
}

/// `GET /reports/:id/sections`
pub async fn list_sections<S, W>(
  State(state): State<ApiState<S, W>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<ReportSection>>, ApiError>
where
  S: KeyedStore,
  W: WorkflowTrigger,
{
  let report_id = parse_report_id(&id)?;
  Ok(Json(state.repo.fetch_sections(&report_id).await?))
}
