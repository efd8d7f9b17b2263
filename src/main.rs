//! Aeon · Quiz & Psychology Backend
//!
//! - Axum HTTP API for quiz questions, MBTI questionnaires and personality analysis
//! - Three independently loaded model slots (quiz / psychology / analysis)
//! - Pattern-based extraction with deterministic fallbacks
//!
//! Important env variables:
//!   PORT                  : u16 (default 8080)
//!   HOST                  : bind address (default 0.0.0.0)
//!   AEON_CONFIG_PATH      : path to TOML config (models, sampling, prompts)
//!   QUIZ_MODEL_PATH       : overrides [models].quiz
//!   PSYCHOLOGY_MODEL_PATH : overrides [models].psychology
//!   ANALYSIS_MODEL_PATH   : overrides [models].analysis
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod backend;
mod catalog;
mod config;
mod domain;
mod extract;
mod generation;
mod logic;
mod personality;
mod protocol;
mod routes;
mod slots;
mod state;
mod stats;
mod telemetry;
mod util;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::backend::ScriptedBackend;
use crate::config::{load_server_config_from_env, ListenConfig};
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let cfg = load_server_config_from_env();
  let listen = ListenConfig::from_env();

  // Shared state: catalog, prompts, slots, counters.
  let state = Arc::new(AppState::new(cfg, Arc::new(ScriptedBackend)));

  // Slots load in parallel; a failed slot only degrades its own feature.
  let loader = state.clone();
  let all_ready = tokio::task::spawn_blocking(move || loader.load_models()).await?;
  if !all_ready {
    warn!(target: "aeon_backend", loaded = ?state.slots.loaded_models(), "Starting with fallback content for unavailable models");
  }

  let app = build_router(state.clone());

  let addr = format!("{}:{}", listen.host, listen.port);
  let listener = TcpListener::bind(&addr).await?;
  info!(target: "aeon_backend", %addr, models_loaded = all_ready, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

  info!(target: "aeon_backend", "Shutting down; unloading model slots");
  state.slots.unload_all();
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      warn!(target: "aeon_backend", error = %e, "Ctrl+C handler unavailable");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        warn!(target: "aeon_backend", error = %e, "SIGTERM handler unavailable");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!(target: "aeon_backend", "Shutdown signal received");
}
