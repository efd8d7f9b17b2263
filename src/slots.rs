//! Model slots: independently loadable backend instances, one per task.
//!
//! Each slot owns its backend handle behind an exclusive lock, so load, unload
//! and generation on one slot never interleave while different slots run fully
//! in parallel. A second, short-lived status lock carries the load state and
//! bookkeeping so readiness checks never wait behind a running generation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::backend::{Backend, LoadOptions, LoadedModel};
use crate::config::{ModelPaths, SamplingDefaults};
use crate::generation::{self, SamplingParams};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
  Quiz,
  Psychology,
  Analysis,
}

impl SlotKind {
  pub const ALL: [SlotKind; 3] = [SlotKind::Quiz, SlotKind::Psychology, SlotKind::Analysis];

  /// Display name recorded on load.
  pub fn model_name(self) -> &'static str {
    match self {
      SlotKind::Quiz => "Quiz-Model",
      SlotKind::Psychology => "Psychology-Model",
      SlotKind::Analysis => "Analysis-Model",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
  Unloaded,
  Loading,
  Ready,
  Failed,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotReport {
  pub kind: SlotKind,
  pub name: String,
  pub path: String,
  pub state: SlotState,
  pub usage_count: u64,
  pub idle_secs: Option<u64>,
  pub description: Option<String>,
  pub size_bytes: u64,
}

struct SlotStatus {
  state: SlotState,
  path: PathBuf,
  name: String,
  last_used: Option<Instant>,
  description: Option<String>,
  size_bytes: u64,
}

pub struct ModelSlot {
  kind: SlotKind,
  status: RwLock<SlotStatus>,
  model: Mutex<Option<Box<dyn LoadedModel>>>,
  usage: AtomicU64,
}

impl ModelSlot {
  pub fn new(kind: SlotKind) -> Self {
    Self {
      kind,
      status: RwLock::new(SlotStatus {
        state: SlotState::Unloaded,
        path: PathBuf::new(),
        name: kind.model_name().to_string(),
        last_used: None,
        description: None,
        size_bytes: 0,
      }),
      model: Mutex::new(None),
      usage: AtomicU64::new(0),
    }
  }

  pub fn kind(&self) -> SlotKind {
    self.kind
  }

  /// Load (or replace) the backend handle. On failure the slot ends up
  /// `Failed` with no handle.
  #[instrument(level = "info", skip(self, backend), fields(slot = ?self.kind, path = %path.display()))]
  pub fn load(&self, backend: &dyn Backend, path: &Path, name: &str, options: LoadOptions) -> bool {
    let mut model = lock(&self.model);
    model.take();
    {
      let mut status = write(&self.status);
      status.state = SlotState::Loading;
      status.path = path.to_path_buf();
      status.name = name.to_string();
      status.description = None;
      status.size_bytes = 0;
    }

    let started = Instant::now();
    match backend.load(path, options) {
      Ok(loaded) => {
        let description = loaded.describe();
        let size_bytes = loaded.size_bytes();
        *model = Some(loaded);
        let mut status = write(&self.status);
        status.state = SlotState::Ready;
        status.last_used = Some(Instant::now());
        status.description = Some(description.clone());
        status.size_bytes = size_bytes;
        info!(target: "slots", %name, %description, context_size = options.context_size, elapsed = ?started.elapsed(), "Model slot ready");
        true
      }
      Err(e) => {
        write(&self.status).state = SlotState::Failed;
        error!(target: "slots", %name, error = %e, "Model slot failed to load");
        false
      }
    }
  }

  /// Release the backend handle. Calling this on an unloaded slot is a no-op.
  pub fn unload(&self) {
    let mut model = lock(&self.model);
    if model.take().is_some() {
      info!(target: "slots", slot = ?self.kind, "Model slot unloaded");
    }
    let mut status = write(&self.status);
    status.state = SlotState::Unloaded;
    status.description = None;
    status.size_bytes = 0;
  }

  pub fn is_ready(&self) -> bool {
    self.state() == SlotState::Ready
  }

  pub fn state(&self) -> SlotState {
    read(&self.status).state
  }

  pub fn path(&self) -> PathBuf {
    read(&self.status).path.clone()
  }

  pub fn name(&self) -> String {
    read(&self.status).name.clone()
  }

  pub fn usage_count(&self) -> u64 {
    self.usage.load(Ordering::Relaxed)
  }

  /// Run `f` with exclusive access to the loaded model, recording usage.
  /// Returns `None` when the slot has no usable handle.
  pub fn with_model<R>(&self, f: impl FnOnce(&mut dyn LoadedModel) -> R) -> Option<R> {
    if !self.is_ready() {
      return None;
    }
    let mut guard = lock(&self.model);
    let model = guard.as_mut()?;
    self.usage.fetch_add(1, Ordering::Relaxed);
    write(&self.status).last_used = Some(Instant::now());
    Some(f(model.as_mut()))
  }

  pub fn report(&self) -> SlotReport {
    let status = read(&self.status);
    SlotReport {
      kind: self.kind,
      name: status.name.clone(),
      path: status.path.display().to_string(),
      state: status.state,
      usage_count: self.usage_count(),
      idle_secs: status.last_used.map(|t| t.elapsed().as_secs()),
      description: status.description.clone(),
      size_bytes: status.size_bytes,
    }
  }
}

/// Owns the three task slots plus the process-wide sampling configuration.
pub struct SlotManager {
  backend: Arc<dyn Backend>,
  quiz: ModelSlot,
  psychology: ModelSlot,
  analysis: ModelSlot,
  sampling: RwLock<SamplingParams>,
  manager: Mutex<()>,
}

impl SlotManager {
  pub fn new(backend: Arc<dyn Backend>) -> Self {
    Self {
      backend,
      quiz: ModelSlot::new(SlotKind::Quiz),
      psychology: ModelSlot::new(SlotKind::Psychology),
      analysis: ModelSlot::new(SlotKind::Analysis),
      sampling: RwLock::new(SamplingParams::default()),
      manager: Mutex::new(()),
    }
  }

  pub fn slot(&self, kind: SlotKind) -> &ModelSlot {
    match kind {
      SlotKind::Quiz => &self.quiz,
      SlotKind::Psychology => &self.psychology,
      SlotKind::Analysis => &self.analysis,
    }
  }

  fn load_options(&self) -> LoadOptions {
    LoadOptions { context_size: self.sampling().context_size }
  }

  pub fn load(&self, kind: SlotKind, path: &Path, name: &str) -> bool {
    self.slot(kind).load(self.backend.as_ref(), path, name, self.load_options())
  }

  /// Startup path: every slot loads on its own thread.
  #[instrument(level = "info", skip_all)]
  pub fn load_all(&self, paths: &ModelPaths) -> bool {
    let jobs = [
      (SlotKind::Quiz, paths.quiz.as_path()),
      (SlotKind::Psychology, paths.psychology.as_path()),
      (SlotKind::Analysis, paths.analysis.as_path()),
    ];
    let results: Vec<bool> = std::thread::scope(|scope| {
      let handles: Vec<_> = jobs
        .iter()
        .map(|(kind, path)| scope.spawn(move || self.load(*kind, path, kind.model_name())))
        .collect();
      handles.into_iter().map(|h| h.join().unwrap_or(false)).collect()
    });
    let ok = results.iter().all(|r| *r);
    if ok {
      info!(target: "slots", "All model slots ready");
    } else {
      warn!(target: "slots", ready = results.iter().filter(|r| **r).count(), total = results.len(), "Some model slots failed to load");
    }
    ok
  }

  pub fn unload(&self, kind: SlotKind) {
    self.slot(kind).unload();
  }

  pub fn unload_all(&self) {
    for kind in SlotKind::ALL {
      self.unload(kind);
    }
  }

  pub fn is_ready(&self, kind: SlotKind) -> bool {
    self.slot(kind).is_ready()
  }

  pub fn all_ready(&self) -> bool {
    SlotKind::ALL.into_iter().all(|k| self.is_ready(k))
  }

  /// Unload and reload every slot from its recorded path, one after another.
  /// Every slot is attempted; the result is true only if all came back.
  #[instrument(level = "info", skip_all)]
  pub fn reload_all(&self) -> bool {
    let _guard = lock(&self.manager);
    info!(target: "slots", "Reloading all model slots");
    let mut ok = true;
    for kind in SlotKind::ALL {
      let slot = self.slot(kind);
      let path = slot.path();
      let name = slot.name();
      slot.unload();
      ok &= slot.load(self.backend.as_ref(), &path, &name, self.load_options());
    }
    ok
  }

  /// Generate text on `kind`; empty when the slot is not ready or the backend fails early.
  pub fn generate(&self, kind: SlotKind, prompt: &str) -> String {
    let params = self.sampling();
    generation::generate(self.slot(kind), prompt, &params)
  }

  /// Apply configured sampling values through the clamping setters.
  pub fn configure(&self, defaults: &SamplingDefaults) {
    self.set_temperature(defaults.temperature);
    self.set_max_tokens(defaults.max_tokens);
    self.set_context_size(defaults.context_size);
  }

  pub fn sampling(&self) -> SamplingParams {
    *read(&self.sampling)
  }

  pub fn set_temperature(&self, temperature: f32) {
    let _guard = lock(&self.manager);
    write(&self.sampling).set_temperature(temperature);
  }

  pub fn set_max_tokens(&self, max_tokens: usize) {
    let _guard = lock(&self.manager);
    write(&self.sampling).set_max_tokens(max_tokens);
  }

  /// Takes effect the next time a slot loads.
  pub fn set_context_size(&self, context_size: usize) {
    let _guard = lock(&self.manager);
    write(&self.sampling).set_context_size(context_size);
  }

  /// "<name> (<n> uses)" for every ready slot.
  pub fn loaded_models(&self) -> Vec<String> {
    SlotKind::ALL
      .into_iter()
      .map(|k| self.slot(k))
      .filter(|s| s.is_ready())
      .map(|s| format!("{} ({} uses)", s.name(), s.usage_count()))
      .collect()
  }

  pub fn memory_usage(&self) -> u64 {
    SlotKind::ALL
      .into_iter()
      .map(|k| self.slot(k).report())
      .filter(|r| r.state == SlotState::Ready)
      .map(|r| r.size_bytes)
      .sum()
  }

  pub fn model_info(&self) -> String {
    let mut lines = vec!["Multi-Model Architecture:".to_string()];
    for report in self.reports() {
      if report.state == SlotState::Ready {
        lines.push(format!(
          "{}: {} (Uses: {})",
          report.name,
          report.description.unwrap_or_default(),
          report.usage_count
        ));
      }
    }
    let params = self.sampling();
    lines.push(format!("Context size: {}", params.context_size));
    lines.push(format!("Max tokens: {}", params.max_tokens));
    lines.push(format!("Temperature: {}", params.temperature));
    lines.join("\n")
  }

  pub fn reports(&self) -> Vec<SlotReport> {
    SlotKind::ALL.into_iter().map(|k| self.slot(k).report()).collect()
  }

  /// Label stamped on records produced by `kind`.
  pub fn model_label(&self, kind: SlotKind) -> String {
    let slot = self.slot(kind);
    let path = slot.path();
    match path.file_name() {
      Some(file) => format!("{} ({})", slot.name(), file.to_string_lossy()),
      None => slot.name(),
    }
  }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
  m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
  l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
  l.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) mod testing {
  //! Backends used by tests across the crate.

  use std::collections::HashMap;
  use std::path::Path;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use crate::backend::{Backend, BackendError, LoadOptions, LoadedModel, ScriptedBackend, TokenId};
  use crate::backend::scripted::ScriptedModel;

  /// Serves scripts from memory, keyed by path; unknown paths fail to load.
  #[derive(Default)]
  pub struct MemoryBackend {
    pub scripts: HashMap<String, String>,
    pub loads: AtomicUsize,
  }

  impl MemoryBackend {
    pub fn with(scripts: &[(&str, &str)]) -> Self {
      Self {
        scripts: scripts.iter().map(|(p, s)| (p.to_string(), s.to_string())).collect(),
        loads: AtomicUsize::new(0),
      }
    }
  }

  impl Backend for MemoryBackend {
    fn load(&self, path: &Path, options: LoadOptions) -> Result<Box<dyn LoadedModel>, BackendError> {
      self.loads.fetch_add(1, Ordering::SeqCst);
      let key = path.display().to_string();
      match self.scripts.get(&key) {
        Some(src) => ScriptedModel::from_source(src, options.context_size)
          .map(|m| Box::new(m) as Box<dyn LoadedModel>)
          .map_err(|reason| BackendError::Load { path: key, reason }),
        None => ScriptedBackend.load(path, options),
      }
    }
  }

  /// Model with a fixed score table per step, used to drive the sampling loop precisely.
  pub struct StepModel {
    pub steps: Vec<Vec<f32>>,
    pub vocab: Vec<&'static str>,
    pub eos: TokenId,
    pub fail_tokenize: bool,
    pub fail_prefill: bool,
    pub fail_decode_after: Option<usize>,
    /// Runs at the start of every `decode_single` call.
    pub on_decode: Option<Box<dyn FnMut() + Send>>,
    pub step: usize,
  }

  impl StepModel {
    pub fn new(vocab: Vec<&'static str>, steps: Vec<Vec<f32>>) -> Self {
      Self {
        steps,
        vocab,
        eos: 0,
        fail_tokenize: false,
        fail_prefill: false,
        fail_decode_after: None,
        on_decode: None,
        step: 0,
      }
    }
  }

  impl LoadedModel for StepModel {
    fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, BackendError> {
      if self.fail_tokenize {
        return Err(BackendError::Tokenize("forced".into()));
      }
      Ok(text.split_whitespace().map(|_| 1).collect())
    }

    fn reset_state(&mut self) {
      self.step = 0;
    }

    fn decode_sequence(&mut self, _tokens: &[TokenId]) -> Result<(), BackendError> {
      if self.fail_prefill {
        return Err(BackendError::Decode("forced prefill".into()));
      }
      Ok(())
    }

    fn decode_single(&mut self, _token: TokenId) -> Result<(), BackendError> {
      if let Some(hook) = self.on_decode.as_mut() {
        hook();
      }
      self.step += 1;
      match self.fail_decode_after {
        Some(n) if self.step >= n => Err(BackendError::Decode("forced step".into())),
        _ => Ok(()),
      }
    }

    fn next_scores(&self) -> Vec<f32> {
      self.steps.get(self.step).cloned().unwrap_or_else(|| {
        let mut eos = vec![0.0; self.vocab.len()];
        eos[self.eos as usize] = 1.0;
        eos
      })
    }

    fn token_to_text(&self, token: TokenId) -> String {
      self.vocab.get(token as usize).map(|s| s.to_string()).unwrap_or_default()
    }

    fn is_end_of_sequence(&self, token: TokenId) -> bool {
      token == self.eos
    }

    fn size_bytes(&self) -> u64 {
      64
    }

    fn describe(&self) -> String {
      "step model".into()
    }
  }

  /// Hands out one pre-built `StepModel` per load.
  pub struct StepBackend {
    pub make: Box<dyn Fn() -> StepModel + Send + Sync>,
  }

  impl Backend for StepBackend {
    fn load(&self, _path: &Path, _options: LoadOptions) -> Result<Box<dyn LoadedModel>, BackendError> {
      Ok(Box::new((self.make)()))
    }
  }
}
