//! JSON REST API for sift.
//!
//! Exposes an axum [`Router`] backed by any [`sift_core::store::KeyedStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sift_api::api_router(state))
//! ```

pub mod alerts;
pub mod error;
pub mod reports;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use sift_core::{
  repository::Repository,
  store::KeyedStore,
  workflow::{StateMachineArn, WorkflowTrigger},
};

pub use error::ApiError;

/// Where to start a workflow execution once an alert has a report.
pub struct Workflow<W> {
  pub target:  StateMachineArn,
  pub trigger: Arc<W>,
}

impl<W> Clone for Workflow<W> {
  fn clone(&self) -> Self {
    Self { target: self.target.clone(), trigger: self.trigger.clone() }
  }
}

/// Shared state threaded through all handlers.
pub struct ApiState<S, W> {
  pub repo:     Arc<Repository<S>>,
  /// `None` disables workflow triggering.
  pub workflow: Option<Workflow<W>>,
}

impl<S, W> Clone for ApiState<S, W> {
  fn clone(&self) -> Self {
    Self { repo: self.repo.clone(), workflow: self.workflow.clone() }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, W>(state: ApiState<S, W>) -> Router<()>
where
  S: KeyedStore + 'static,
  W: WorkflowTrigger + 'static,
{
  Router::new()
    .route("/alerts", post(alerts::ingest::<S, W>))
    .route("/reports/{id}/alerts", get(reports::list_alerts::<S, W>))
    .route(
      "/reports/{id}/attributes",
      get(reports::list_admissions::<S, W>).post(reports::admit::<S, W>),
    )
    .route(
      "/reports/{id}/sections",
      get(reports::list_sections::<S, W>).post(reports::add_section::<S, W>),
    )
    .with_state(state)
}
