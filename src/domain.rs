//! Domain models: quiz questions, psychology questions, answers and personality results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four MBTI dichotomies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitAxis {
  #[serde(rename = "E/I")]
  EI,
  #[serde(rename = "S/N")]
  SN,
  #[serde(rename = "T/F")]
  TF,
  #[serde(rename = "J/P")]
  JP,
}

impl TraitAxis {
  pub const ALL: [TraitAxis; 4] = [TraitAxis::EI, TraitAxis::SN, TraitAxis::TF, TraitAxis::JP];

  /// Axis a question belongs to, by its 1-based position in the questionnaire.
  pub fn for_question(question_id: u32) -> Self {
    match question_id {
      0..=2 => TraitAxis::EI,
      3..=4 => TraitAxis::SN,
      5..=6 => TraitAxis::TF,
      _ => TraitAxis::JP,
    }
  }

  pub fn code(self) -> &'static str {
    match self {
      TraitAxis::EI => "E/I",
      TraitAxis::SN => "S/N",
      TraitAxis::TF => "T/F",
      TraitAxis::JP => "J/P",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    TraitAxis::ALL.into_iter().find(|a| a.code() == code)
  }

  /// (dominant, paired) letters; the dominant one wins ties.
  pub fn letters(self) -> (char, char) {
    match self {
      TraitAxis::EI => ('E', 'I'),
      TraitAxis::SN => ('S', 'N'),
      TraitAxis::TF => ('T', 'F'),
      TraitAxis::JP => ('J', 'P'),
    }
  }
}

impl fmt::Display for TraitAxis {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub question: String,
  pub answers: Vec<String>,
  pub correct_answer_index: usize,
  pub category: String,
  pub difficulty: String,
  pub correct_answer_price_multiplier: f64,
  pub wrong_answer_price_multiplier: f64,
  pub steal_chance: f64,
  pub steal_percentage: f64,
  pub generated: bool,
  pub ai_model: String,
  pub generation_time_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychologicalQuestion {
  pub id: u32,
  pub question: String,
  pub options: Vec<String>,
  #[serde(rename = "trait")]
  pub trait_axis: TraitAxis,
  pub category: String,
  pub generated: bool,
  pub ai_model: String,
  pub generation_time_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityAnswer {
  #[serde(default = "default_question_id")]
  pub question_id: u32,
  #[serde(default)]
  pub selected_option: u32,
  #[serde(default)]
  pub value: Option<String>,
  // Informational only: scoring derives the axis from `question_id`.
  #[serde(default = "default_trait", rename = "trait")]
  pub trait_code: String,
}

fn default_question_id() -> u32 {
  1
}

fn default_trait() -> String {
  "E/I".into()
}

/// Per-letter trait scores. Paired letters always sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraitScores {
  #[serde(rename = "E")]
  pub e: f64,
  #[serde(rename = "I")]
  pub i: f64,
  #[serde(rename = "S")]
  pub s: f64,
  #[serde(rename = "N")]
  pub n: f64,
  #[serde(rename = "T")]
  pub t: f64,
  #[serde(rename = "F")]
  pub f: f64,
  #[serde(rename = "J")]
  pub j: f64,
  #[serde(rename = "P")]
  pub p: f64,
}

impl Default for TraitScores {
  fn default() -> Self {
    Self { e: 0.5, i: 0.5, s: 0.5, n: 0.5, t: 0.5, f: 0.5, j: 0.5, p: 0.5 }
  }
}

impl TraitScores {
  pub fn pair(&self, axis: TraitAxis) -> (f64, f64) {
    match axis {
      TraitAxis::EI => (self.e, self.i),
      TraitAxis::SN => (self.s, self.n),
      TraitAxis::TF => (self.t, self.f),
      TraitAxis::JP => (self.j, self.p),
    }
  }

  pub fn set_dominant(&mut self, axis: TraitAxis, value: f64) {
    let (dominant, paired) = match axis {
      TraitAxis::EI => (&mut self.e, &mut self.i),
      TraitAxis::SN => (&mut self.s, &mut self.n),
      TraitAxis::TF => (&mut self.t, &mut self.f),
      TraitAxis::JP => (&mut self.j, &mut self.p),
    };
    *dominant = value;
    *paired = 1.0 - value;
  }

  pub fn values(&self) -> [f64; 8] {
    [self.e, self.i, self.s, self.n, self.t, self.f, self.j, self.p]
  }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityResult {
  pub personality_type: String,
  pub title: String,
  pub description: String,
  pub scores: TraitScores,
  pub strengths: Vec<String>,
  pub growth_areas: Vec<String>,
  pub confidence: f64,
  pub ai_generated: bool,
  pub analysis_model: String,
  pub analysis_time_ms: u64,
}
