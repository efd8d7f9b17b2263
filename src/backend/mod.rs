//! Text-generation backend seam.
//!
//! The slot manager only ever talks to a model through these two traits:
//!   - `Backend` turns a model path into a loaded handle
//!   - `LoadedModel` exposes the decoding primitives the generation loop needs
//!
//! Dropping a `LoadedModel` releases whatever the backend allocated for it.

use std::path::Path;

use thiserror::Error;

pub mod scripted;

pub use scripted::ScriptedBackend;

pub type TokenId = u32;

#[derive(Debug, Error)]
pub enum BackendError {
  #[error("failed to load model from {path}: {reason}")]
  Load { path: String, reason: String },
  #[error("tokenization failed: {0}")]
  Tokenize(String),
  #[error("decode failed: {0}")]
  Decode(String),
}

/// Options handed to the backend when a slot (re)loads.
#[derive(Clone, Copy, Debug)]
pub struct LoadOptions {
  pub context_size: usize,
}

pub trait Backend: Send + Sync {
  fn load(&self, path: &Path, options: LoadOptions) -> Result<Box<dyn LoadedModel>, BackendError>;
}

/// A loaded model with its own decoding state.
pub trait LoadedModel: Send {
  fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, BackendError>;

  /// Clears the decoding state (KV cache or equivalent).
  fn reset_state(&mut self);

  /// Feeds a whole token sequence in one step.
  fn decode_sequence(&mut self, tokens: &[TokenId]) -> Result<(), BackendError>;

  fn decode_single(&mut self, token: TokenId) -> Result<(), BackendError> {
    self.decode_sequence(&[token])
  }

  /// Scores over the whole vocabulary for the next position, indexed by token id.
  fn next_scores(&self) -> Vec<f32>;

  fn token_to_text(&self, token: TokenId) -> String;

  fn is_end_of_sequence(&self, token: TokenId) -> bool;

  fn size_bytes(&self) -> u64;

  /// Short human-readable description, e.g. for `/api/model/info`.
  fn describe(&self) -> String;
}
