//! Opaque token generation for report identities and log sub-keys.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces globally unique tokens. Collisions must be negligible for the
/// lifetime of the store.
pub trait IdGenerator: Send + Sync {
  fn next_id(&self) -> String;
}

/// Random v4 UUIDs, hyphenated lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
  fn next_id(&self) -> String { Uuid::new_v4().hyphenated().to_string() }
}

/// `{prefix}{n}` with `n` counting up from 1. Unique within one process only,
/// so it is meant for tests and deterministic replays.
#[derive(Debug)]
pub struct SequenceGenerator {
  prefix: String,
  next:   AtomicU64,
}

impl SequenceGenerator {
  pub fn new(prefix: impl Into<String>) -> Self {
    Self { prefix: prefix.into(), next: AtomicU64::new(1) }
  }
}

impl IdGenerator for SequenceGenerator {
  fn next_id(&self) -> String {
    let n = self.next.fetch_add(1, Ordering::Relaxed);
    format!("{}{n}", self.prefix)
  }
}
