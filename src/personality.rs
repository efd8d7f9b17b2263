//! MBTI scoring: answers -> trait scores -> four-letter type.

use crate::catalog::{Catalog, GENERIC_DESCRIPTION, GENERIC_GROWTH, GENERIC_STRENGTHS, GENERIC_TITLE};
use crate::domain::{PersonalityAnswer, TraitAxis, TraitScores};

const LEANING_FIRST: f64 = 0.8;
const LEANING_LAST: f64 = 0.2;
const NEUTRAL: f64 = 0.5;

/// Fold answers into trait scores. The axis comes from the answer's position
/// (question id), never from its own trait field.
pub fn score(answers: &[PersonalityAnswer]) -> TraitScores {
  let mut scores = TraitScores::default();
  for answer in answers {
    let axis = TraitAxis::for_question(answer.question_id);
    let raw = match answer.selected_option {
      0 => LEANING_FIRST,
      2 => LEANING_LAST,
      _ => NEUTRAL,
    };
    let (dominant, _) = scores.pair(axis);
    scores.set_dominant(axis, (dominant + raw) / 2.0);
  }
  scores
}

/// Four-letter type; an exact tie keeps the dominant letter (E, S, T, J).
pub fn derive_type(scores: &TraitScores) -> String {
  TraitAxis::ALL
    .into_iter()
    .map(|axis| {
      let (dominant, paired) = scores.pair(axis);
      let (d, p) = axis.letters();
      if paired > dominant { p } else { d }
    })
    .collect()
}

/// 0.0 for all-neutral scores, 1.0 when every score sits at 0 or 1.
pub fn confidence(scores: &TraitScores) -> f64 {
  let values = scores.values();
  let spread: f64 = values.iter().map(|v| (v - NEUTRAL).abs()).sum::<f64>() / values.len() as f64;
  (spread * 2.0).clamp(0.0, 1.0)
}

/// Static description, title, strengths and growth areas for a type.
pub struct ProfileView {
  pub title: String,
  pub description: String,
  pub strengths: Vec<String>,
  pub growth_areas: Vec<String>,
}

pub fn profile_view(catalog: &Catalog, personality_type: &str) -> ProfileView {
  let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
  match catalog.profile(personality_type) {
    Some(profile) => ProfileView {
      title: title_of(profile.description),
      description: profile.description.to_string(),
      strengths: owned(&profile.strengths),
      growth_areas: owned(&profile.growth),
    },
    None => ProfileView {
      title: GENERIC_TITLE.to_string(),
      description: GENERIC_DESCRIPTION.to_string(),
      strengths: owned(&GENERIC_STRENGTHS),
      growth_areas: owned(&GENERIC_GROWTH),
    },
  }
}

/// "The Architect - Strategic, ..." -> "The Architect".
fn title_of(description: &str) -> String {
  match description.split_once(" - ") {
    Some((title, _)) => title.to_string(),
    None => GENERIC_TITLE.to_string(),
  }
}
