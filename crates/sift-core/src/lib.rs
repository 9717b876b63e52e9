//! Core types and correlation logic for the sift alert store.
//!
//! This crate turns a keyed, conditionally-writable, TTL-capable store into
//! an exactly-once report allocator and an at-most-once attribute gate. It is
//! deliberately free of HTTP and database dependencies; backends implement
//! [`store::KeyedStore`] and everything else is written against that trait.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod clock;
pub mod correlation;
pub mod error;
pub mod gate;
pub mod ident;
pub mod log;
pub mod memory;
pub mod record;
pub mod repository;
pub mod settings;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
