//! Runtime pieces of the sift server: configuration and the HTTP workflow
//! trigger. The binary in `main.rs` wires them to the SQLite store and the
//! API router.

pub mod config;
pub mod trigger;

pub use config::ServerConfig;
pub use trigger::HttpTrigger;
