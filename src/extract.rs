//! Pulls structured fields out of free-form model output.
//!
//! Every extractor has a fallback, so callers always get a usable value.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

static QUESTION_MARKED: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"Question:\s*([^?]*\?)").expect("static regex"));
static QUESTION_SENTENCE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[^.!?]+\?").expect("static regex"));
static OPTION_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\b([ABC])\)").expect("static regex"));
static ANSWER_LETTER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"Answer:\s*([ABC])").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

pub const QUIZ_OPTION_PADDING: [&str; 3] = ["Option 1", "Option 2", "Option 3"];
pub const PSYCHOLOGY_OPTION_PADDING: [&str; 3] = ["Strongly agree", "Neutral", "Strongly disagree"];

/// Weights of the correct-answer fallback for indices 0, 1 and 2.
const FALLBACK_WEIGHTS: [u32; 3] = [50, 30, 20];

/// Collapse whitespace runs into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
  WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Question text, or an empty string when nothing question-like is present.
pub fn extract_question(text: &str) -> String {
  let marked = QUESTION_MARKED
    .captures(text)
    .and_then(|c| c.get(1))
    .and_then(|m| clean_question(m.as_str()));
  marked
    .or_else(|| QUESTION_SENTENCE.find(text).and_then(|m| clean_question(m.as_str())))
    .unwrap_or_default()
}

/// Normalized question, or `None` when only a bare "?" is left.
fn clean_question(raw: &str) -> Option<String> {
  let q = normalize_whitespace(raw);
  let q = q.strip_prefix("Question:").map(str::trim_start).unwrap_or(&q);
  (!q.is_empty() && q != "?").then(|| q.to_string())
}

/// Exactly three quiz options, padded with "Option N".
pub fn extract_answers(text: &str) -> Vec<String> {
  pad_options(lettered_options(text), &QUIZ_OPTION_PADDING)
}

/// Exactly three psychology options, padded with the agree/neutral/disagree scale.
pub fn extract_psychology_options(text: &str) -> Vec<String> {
  pad_options(lettered_options(text), &PSYCHOLOGY_OPTION_PADDING)
}

pub fn extract_correct_answer(text: &str) -> usize {
  extract_correct_answer_with(text, &mut rand::thread_rng())
}

/// Index named by "Answer: X"; without one, a weighted draw biased toward 0.
pub fn extract_correct_answer_with<R: Rng>(text: &str, rng: &mut R) -> usize {
  let marked = ANSWER_LETTER
    .captures(text)
    .and_then(|c| c.get(1))
    .and_then(|m| letter_index(m.as_str()));
  match marked {
    Some(idx) => idx,
    None => weighted_fallback(rng),
  }
}

fn weighted_fallback<R: Rng>(rng: &mut R) -> usize {
  let total: u32 = FALLBACK_WEIGHTS.iter().sum();
  let mut roll = rng.gen_range(0..total);
  for (idx, weight) in FALLBACK_WEIGHTS.iter().enumerate() {
    if roll < *weight {
      return idx;
    }
    roll -= weight;
  }
  0
}

fn letter_index(letter: &str) -> Option<usize> {
  match letter {
    "A" => Some(0),
    "B" => Some(1),
    "C" => Some(2),
    _ => None,
  }
}

/// Option texts in order of appearance. Each runs from its marker to the next
/// marker, a newline or an "Answer:" marker, whichever comes first.
fn lettered_options(text: &str) -> Vec<String> {
  let markers: Vec<(usize, usize)> = OPTION_MARKER.find_iter(text).map(|m| (m.start(), m.end())).collect();
  let mut options = Vec::new();
  for (i, (_, body_start)) in markers.iter().enumerate() {
    let body_end = markers.get(i + 1).map(|(start, _)| *start).unwrap_or(text.len());
    let mut body = &text[*body_start..body_end];
    if let Some(cut) = body.find('\n') {
      body = &body[..cut];
    }
    if let Some(cut) = body.find("Answer:") {
      body = &body[..cut];
    }
    let cleaned = normalize_whitespace(body);
    let cleaned = cleaned.trim_end_matches(|c: char| c == ',' || c == ';' || c.is_whitespace());
    if !cleaned.is_empty() {
      options.push(cleaned.to_string());
    }
    if options.len() == 3 {
      break;
    }
  }
  options
}

fn pad_options(mut options: Vec<String>, padding: &[&str; 3]) -> Vec<String> {
  options.truncate(3);
  while options.len() < 3 {
    options.push(padding[options.len()].to_string());
  }
  options
}
