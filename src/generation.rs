//! Token-by-token generation on one model slot.

use tracing::{debug, instrument, warn};

use crate::backend::{LoadedModel, TokenId};
use crate::slots::ModelSlot;
use crate::util::trunc_for_log;

const ANSWER_MARKER: &str = "Answer:";
const ANSWER_STOP_LEN: usize = 50;

/// Sampling configuration shared by all slots. Setters clamp into the supported range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
  pub temperature: f32,
  pub max_tokens: usize,
  pub context_size: usize,
}

impl Default for SamplingParams {
  fn default() -> Self {
    Self { temperature: 0.7, max_tokens: 128, context_size: 1024 }
  }
}

impl SamplingParams {
  pub fn set_temperature(&mut self, temperature: f32) {
    self.temperature = temperature.clamp(0.1, 1.5);
  }

  pub fn set_max_tokens(&mut self, max_tokens: usize) {
    self.max_tokens = max_tokens.clamp(32, 256);
  }

  pub fn set_context_size(&mut self, context_size: usize) {
    self.context_size = context_size.clamp(512, 2048);
  }
}

/// Generate a continuation of `prompt` on `slot`.
///
/// Returns an empty string when the slot is not ready or the prompt cannot be
/// ingested, and whatever was produced so far if decoding fails midway.
#[instrument(level = "debug", skip(slot, prompt, params), fields(slot = ?slot.kind()))]
pub fn generate(slot: &ModelSlot, prompt: &str, params: &SamplingParams) -> String {
  match slot.with_model(|model| run(model, prompt, params)) {
    Some(text) => text,
    None => {
      warn!(target: "generation", slot = ?slot.kind(), "Slot not ready; nothing generated");
      String::new()
    }
  }
}

fn run(model: &mut dyn LoadedModel, prompt: &str, params: &SamplingParams) -> String {
  model.reset_state();

  let tokens = match model.tokenize(prompt) {
    Ok(t) if !t.is_empty() => t,
    Ok(_) => {
      warn!(target: "generation", "Prompt produced no tokens");
      return String::new();
    }
    Err(e) => {
      warn!(target: "generation", error = %e, "Tokenization failed");
      return String::new();
    }
  };
  if let Err(e) = model.decode_sequence(&tokens) {
    warn!(target: "generation", error = %e, prompt_tokens = tokens.len(), "Prompt decode failed");
    return String::new();
  }

  let mut out = String::new();
  for step in 0..params.max_tokens {
    let scores = model.next_scores();
    let Some(token) = select_token(&scores, params.temperature) else {
      debug!(target: "generation", step, "Empty distribution; stopping");
      break;
    };
    if model.is_end_of_sequence(token) {
      break;
    }
    out.push_str(&model.token_to_text(token));

    // A complete "Question ... Answer:X" block is all callers ever parse.
    if out.len() > ANSWER_STOP_LEN && out.contains(ANSWER_MARKER) {
      break;
    }
    if let Err(e) = model.decode_single(token) {
      warn!(target: "generation", step, error = %e, "Decode failed; returning partial text");
      break;
    }
  }

  debug!(target: "generation", chars = out.len(), text = %trunc_for_log(&out, 120), "Generation finished");
  out
}

/// Pick the next token from raw scores. Ties resolve to the lowest id.
///
/// At positive temperature the scores go through a numerically stable softmax
/// first; the pick is still the most probable token, so output is repeatable.
pub fn select_token(scores: &[f32], temperature: f32) -> Option<TokenId> {
  if scores.is_empty() {
    return None;
  }
  if temperature <= 0.0 {
    return argmax(scores);
  }

  let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = scores.iter().map(|s| ((s - max) / temperature).exp()).collect();
  let sum: f32 = exps.iter().sum();
  if !sum.is_finite() || sum <= 0.0 {
    return argmax(scores);
  }
  let probs: Vec<f32> = exps.into_iter().map(|e| e / sum).collect();
  argmax(&probs)
}

fn argmax(values: &[f32]) -> Option<TokenId> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, v) in values.iter().copied().enumerate() {
    match best {
      Some((_, b)) if v <= b => {}
      _ if v.is_nan() => {}
      _ => best = Some((idx, v)),
    }
  }
  best.map(|(idx, _)| idx as TokenId)
}
