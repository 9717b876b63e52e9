//! Error types for `sift-core`.
//!
//! A conditional-write conflict is not an error: it is a branch of
//! [`PutOutcome`](crate::store::PutOutcome) and never shows up here.

use std::fmt;

use thiserror::Error;

/// The storage round-trip that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
  ConditionalPut,
  Get,
  GetAll,
  PurgeExpired,
}

impl fmt::Display for StoreOp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::ConditionalPut => "conditional put",
      Self::Get => "get",
      Self::GetAll => "get all",
      Self::PurgeExpired => "purge expired",
    })
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Input rejected before any storage call was attempted.
  #[error("malformed {what}: {value:?}")]
  MalformedInput { what: &'static str, value: String },

  /// The backing store failed or timed out. Safe to retry the whole call.
  #[error("{op} failed at {partition_key}/{}: {source}", sort_key.as_deref().unwrap_or("*"))]
  Store {
    op:            StoreOp,
    partition_key: String,
    sort_key:      Option<String>,
    #[source]
    source:        Box<dyn std::error::Error + Send + Sync>,
  },

  /// A stored payload could not be parsed into its entity shape.
  #[error("cannot decode record {partition_key}/{sort_key}: {source}")]
  Decode {
    partition_key: String,
    sort_key:      String,
    #[source]
    source:        serde_json::Error,
  },

  /// A stored record lacks a field the protocol always writes.
  #[error("record {partition_key}/{sort_key} has no {field}")]
  MissingField {
    partition_key: String,
    sort_key:      String,
    field:         &'static str,
  },

  /// A write was rejected, but the record that blocked it was gone by the
  /// time it was read back.
  #[error("conflicting record at {partition_key}/{sort_key} disappeared")]
  VanishedConflict {
    partition_key: String,
    sort_key:      String,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error with the operation and keys it happened on.
  pub fn store<E>(op: StoreOp, partition_key: &str, sort_key: Option<&str>, source: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store {
      op,
      partition_key: partition_key.to_owned(),
      sort_key: sort_key.map(str::to_owned),
      source: Box::new(source),
    }
  }

  /// `true` for failures a caller may resolve by retrying the operation.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Store { .. } | Self::VanishedConflict { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
