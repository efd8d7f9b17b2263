//! Scripted backend: a deterministic stand-in for a real inference library.
//!
//! A "model file" is plain text holding one or more completions separated by
//! lines consisting of `---`. Lines starting with `#` are comments.
//!
//! Tokenization is GPT-2 flavoured: every token is a run of whitespace followed
//! by a run of non-whitespace (" word"), so concatenating token texts gives the
//! source back. After a prompt is decoded the model commits to one completion
//! (rotating per generation and keyed by the prompt) and its score
//! distribution then always favours the next token of that completion, ending
//! with the end-of-sequence token.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, instrument};

use super::{Backend, BackendError, LoadOptions, LoadedModel, TokenId};

const EOS_TOKEN: TokenId = 0;
const UNK_TOKEN: TokenId = 1;
const FAVOURED_SCORE: f32 = 12.0;
const BASELINE_SCORE: f32 = -4.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptedBackend;

impl Backend for ScriptedBackend {
  #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
  fn load(&self, path: &Path, options: LoadOptions) -> Result<Box<dyn LoadedModel>, BackendError> {
    let source = std::fs::read_to_string(path).map_err(|e| BackendError::Load {
      path: path.display().to_string(),
      reason: e.to_string(),
    })?;
    let model = ScriptedModel::from_source(&source, options.context_size).map_err(|reason| BackendError::Load {
      path: path.display().to_string(),
      reason,
    })?;
    debug!(target: "slots", completions = model.completions.len(), vocab = model.vocab.len(), "Scripted model parsed");
    Ok(Box::new(model))
  }
}

pub struct ScriptedModel {
  vocab: Vec<String>,
  lookup: HashMap<String, TokenId>,
  completions: Vec<Vec<TokenId>>,
  context_size: usize,
  source_len: u64,

  // decoding state
  rounds: usize,
  active: Option<usize>,
  position: usize,
  consumed: usize,
}

impl ScriptedModel {
  pub fn from_source(source: &str, context_size: usize) -> Result<Self, String> {
    let mut vocab = vec!["</s>".to_string(), "<unk>".to_string()];
    let mut lookup = HashMap::new();
    let mut completions = Vec::new();

    for block in split_completions(source) {
      let mut ids = Vec::new();
      for piece in split_pieces(&block) {
        let id = *lookup.entry(piece.to_string()).or_insert_with(|| {
          vocab.push(piece.to_string());
          (vocab.len() - 1) as TokenId
        });
        ids.push(id);
      }
      completions.push(ids);
    }

    if completions.is_empty() {
      return Err("script contains no completions".into());
    }

    Ok(Self {
      vocab,
      lookup,
      completions,
      context_size,
      source_len: source.len() as u64,
      rounds: 0,
      active: None,
      position: 0,
      consumed: 0,
    })
  }

  fn expected_token(&self) -> TokenId {
    match self.active {
      Some(idx) => self.completions[idx].get(self.position).copied().unwrap_or(EOS_TOKEN),
      None => EOS_TOKEN,
    }
  }
}

impl LoadedModel for ScriptedModel {
  fn tokenize(&self, text: &str) -> Result<Vec<TokenId>, BackendError> {
    let tokens: Vec<TokenId> = split_pieces(text)
      .into_iter()
      .map(|p| self.lookup.get(p).copied().unwrap_or(UNK_TOKEN))
      .collect();
    if tokens.len() > self.context_size {
      return Err(BackendError::Tokenize(format!(
        "prompt has {} tokens, context holds {}",
        tokens.len(),
        self.context_size
      )));
    }
    Ok(tokens)
  }

  fn reset_state(&mut self) {
    self.rounds = self.rounds.wrapping_add(1);
    self.active = None;
    self.position = 0;
    self.consumed = 0;
  }

  fn decode_sequence(&mut self, tokens: &[TokenId]) -> Result<(), BackendError> {
    if tokens.is_empty() {
      return Err(BackendError::Decode("empty batch".into()));
    }
    if self.consumed + tokens.len() > self.context_size {
      return Err(BackendError::Decode("context window exhausted".into()));
    }
    self.consumed += tokens.len();

    match self.active {
      None => {
        let key = tokens.iter().fold(self.rounds, |acc, t| acc.wrapping_mul(31).wrapping_add(*t as usize));
        self.active = Some(key % self.completions.len());
        self.position = 0;
      }
      Some(_) => self.position += tokens.len(),
    }
    Ok(())
  }

  fn next_scores(&self) -> Vec<f32> {
    let mut scores = vec![BASELINE_SCORE; self.vocab.len()];
    scores[self.expected_token() as usize] = FAVOURED_SCORE;
    scores
  }

  fn token_to_text(&self, token: TokenId) -> String {
    match token {
      EOS_TOKEN | UNK_TOKEN => String::new(),
      t => self.vocab.get(t as usize).cloned().unwrap_or_default(),
    }
  }

  fn is_end_of_sequence(&self, token: TokenId) -> bool {
    token == EOS_TOKEN
  }

  fn size_bytes(&self) -> u64 {
    self.source_len
  }

  fn describe(&self) -> String {
    format!("scripted ({} completions, {} tokens)", self.completions.len(), self.vocab.len())
  }
}

fn split_completions(source: &str) -> Vec<String> {
  let mut blocks = Vec::new();
  let mut current: Vec<&str> = Vec::new();
  for line in source.lines() {
    if line.trim_start().starts_with('#') {
      continue;
    }
    if line.trim() == "---" {
      push_block(&mut blocks, &current);
      current.clear();
    } else {
      current.push(line);
    }
  }
  push_block(&mut blocks, &current);
  blocks
}

fn push_block(blocks: &mut Vec<String>, lines: &[&str]) {
  let text = lines.join("\n");
  let text = text.trim_matches('\n');
  if !text.trim().is_empty() {
    blocks.push(text.to_string());
  }
}

/// Splits text into "leading whitespace + word" pieces without losing any byte.
fn split_pieces(text: &str) -> Vec<&str> {
  let mut pieces = Vec::new();
  let mut start = 0;
  let mut in_word = false;
  for (idx, ch) in text.char_indices() {
    if ch.is_whitespace() {
      if in_word {
        pieces.push(&text[start..idx]);
        start = idx;
        in_word = false;
      }
    } else {
      in_word = true;
    }
  }
  if start < text.len() {
    pieces.push(&text[start..]);
  }
  pieces
}
