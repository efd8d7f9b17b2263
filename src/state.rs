//! Application state shared by every handler.
//!
//! This module owns:
//!   - the static catalog (categories, difficulty modifiers, personality profiles)
//!   - the prompt templates (from TOML or defaults)
//!   - the model slot manager
//!   - generation and request counters
//!
//! Everything here is either immutable after startup or internally synchronized,
//! so the whole state lives behind a plain `Arc`.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::backend::Backend;
use crate::catalog::Catalog;
use crate::config::{ModelPaths, Prompts, ServerConfig};
use crate::slots::SlotManager;
use crate::stats::{GenerationStats, RequestCounters};

pub struct AppState {
  pub catalog: Catalog,
  pub prompts: Prompts,
  pub models: ModelPaths,
  pub slots: SlotManager,
  pub stats: GenerationStats,
  pub requests: RequestCounters,
}

impl AppState {
  /// Build state from config. Slots start unloaded; call `load_models`.
  #[instrument(level = "info", skip_all)]
  pub fn new(cfg: ServerConfig, backend: Arc<dyn Backend>) -> Self {
    let slots = SlotManager::new(backend);
    slots.configure(&cfg.sampling);
    let sampling = slots.sampling();
    info!(
      target: "aeon_backend",
      temperature = sampling.temperature,
      max_tokens = sampling.max_tokens,
      context_size = sampling.context_size,
      quiz_model = %cfg.models.quiz.display(),
      psychology_model = %cfg.models.psychology.display(),
      analysis_model = %cfg.models.analysis.display(),
      "Application state initialized"
    );
    Self {
      catalog: Catalog::new(),
      prompts: cfg.prompts,
      models: cfg.models,
      slots,
      stats: GenerationStats::new(),
      requests: RequestCounters::new(),
    }
  }

  /// Load every configured model slot in parallel. True when all are ready.
  pub fn load_models(&self) -> bool {
    self.slots.load_all(&self.models)
  }

  pub fn models_loaded(&self) -> bool {
    self.slots.all_ready()
  }
}
