//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] sift_core::Error),

  #[error("workflow trigger failed: {0}")]
  Trigger(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Core(sift_core::Error::MalformedInput { .. }) => StatusCode::BAD_REQUEST,
      ApiError::Core(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Trigger(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
