//! Server configuration, read from an optional TOML file layered with
//! `SIFT_*` environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `SIFT_STORE__CORRELATION_WINDOW_SECS=7200`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use sift_core::{settings::Settings, workflow::StateMachineArn};

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// State machine to start for every correlated alert.
  pub workflow_arn:        Option<String>,
  /// URL that accepts start-execution requests for `workflow_arn`.
  pub workflow_endpoint:   Option<String>,
  /// Seconds between expiry purges; `0` disables the sweeper.
  #[serde(default = "default_purge_interval")]
  pub purge_interval_secs: u64,
  #[serde(default)]
  pub store:               Settings,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("sift.db") }

fn default_purge_interval() -> u64 { 300 }

/// A validated workflow target.
#[derive(Debug, Clone)]
pub struct WorkflowTarget {
  pub arn:      StateMachineArn,
  pub endpoint: String,
}

impl ServerConfig {
  /// Layer `path` (if it exists) under the process environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SIFT")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  /// Parse the workflow settings. A malformed ARN or an ARN without an
  /// endpoint is a startup error.
  pub fn workflow(&self) -> anyhow::Result<Option<WorkflowTarget>> {
    let Some(raw) = &self.workflow_arn else {
      return Ok(None);
    };
    let arn = StateMachineArn::parse(raw).context("invalid workflow_arn")?;
    let endpoint = self
      .workflow_endpoint
      .clone()
      .context("workflow_arn is set but workflow_endpoint is not")?;
    Ok(Some(WorkflowTarget { arn, endpoint }))
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf {
    let s = self.store_path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
      && let Ok(home) = std::env::var("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.store_path.clone()
  }
}
