//! Study Tool · Quiz Session Backend
//!
//! - Axum HTTP + WebSocket API driving quiz sessions
//! - Quiz banks fetched at startup from configurable candidate paths
//! - Session progress mirrored to a key-value store (memory or JSON file)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   STUDY_CONFIG_PATH : path to TOML config (bank list, candidate paths, storage)
//!   QUIZ_BASE_URL     : base URL bank paths resolve against (default: this server)
//!   STORE_PATH        : JSON file for durable session state (default: in-memory)
//!   SESSION_IDLE_SECS : evict live sessions idle this long (default 1800, 0 = never)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"
//!
//! Subcommand:
//!   add-titles [DIR]  : add a `title` field to every bank file in DIR (default quiz_dir)

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod quiz;
mod fetch;
mod loader;
mod store;
mod persistence;
mod session;
mod state;
mod protocol;
mod logic;
mod routes;
mod tools;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::routes::build_router;
use crate::state::{sweep_idle_sessions, AppState};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();
  let config = config::load_config_from_env();

  let mut args = std::env::args().skip(1);
  if args.next().as_deref() == Some("add-titles") {
    let dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(&config.quiz_dir));
    let report = tools::add_title_fields(&dir)?;
    info!(target: "study_tool", updated = report.updated.len(), skipped = report.skipped.len(), failed = report.failed.len(), "Finished processing bank files");
    return Ok(());
  }

  // Shared application state (store, session registry; banks arrive later).
  let state = Arc::new(AppState::new(config.clone()));
  let app = build_router(state.clone());

  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "study_tool", %addr, "HTTP server listening");

  // Banks may be served by this very process, so load only once we are listening.
  let loader_state = state.clone();
  tokio::spawn(async move {
    let banks = loader::load_from_config(&loader_state.config).await;
    loader_state.install_banks(banks).await;
  });

  if let Some(idle) = config.session_idle() {
    tokio::spawn(sweep_idle_sessions(state.clone(), idle));
  }

  let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;
  if let Err(e) = state.store.flush() {
    error!(target: "study_tool", error = %e, "Final store flush failed");
  }
  if let Err(e) = served {
    error!(target: "study_tool", error = %e, "Server error");
    return Err(e.into());
  }
  info!(target: "study_tool", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "study_tool", error = %e, "Failed to listen for shutdown signal");
  }
}
