//! sift server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the JSON API over HTTP. Expired records are
//! purged in the background every `purge_interval_secs`.
//!
//! To purge once and exit (e.g. from cron):
//!
//! ```
//! cargo run -p sift-server -- --purge
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use sift_api::{ApiState, Workflow};
use sift_core::repository::Repository;
use sift_server::{HttpTrigger, ServerConfig};
use sift_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "sift alert correlation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Delete expired records once and exit.
  #[arg(long)]
  purge: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;
  let workflow = server_cfg.workflow()?;

  // Open SQLite store.
  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let repo = Arc::new(Repository::new(Arc::new(store), &server_cfg.store));

  // Helper mode: purge and exit.
  if cli.purge {
    let purged = repo.purge_expired().await.context("purge failed")?;
    tracing::info!(purged, "expired records removed");
    return Ok(());
  }

  if server_cfg.purge_interval_secs > 0 {
    spawn_sweeper(repo.clone(), Duration::from_secs(server_cfg.purge_interval_secs));
  }

  let workflow = match workflow {
    Some(target) => {
      tracing::info!(arn = %target.arn, endpoint = %target.endpoint, "workflow trigger enabled");
      Some(Workflow {
        trigger: Arc::new(HttpTrigger::new(target.endpoint)?),
        target:  target.arn,
      })
    }
    None => {
      tracing::warn!("no workflow_arn configured; reports will not be dispatched");
      None
    }
  };

  let state = ApiState { repo, workflow };
  let app = Router::new()
    .nest("/api", sift_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Purge expired records on a fixed interval for the life of the process.
fn spawn_sweeper(repo: Arc<Repository<SqliteStore>>, every: Duration) {
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      match repo.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "expired records removed"),
        Err(e) => tracing::warn!(error = %e, "expiry purge failed"),
      }
    }
  });
}
