//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Quiz question generation (quiz slot + extraction + difficulty modifiers)
//!   - Psychology questionnaire generation (psychology slot, fixed category cycle)
//!   - Personality analysis (scoring + optional model-written description)
//!
//! All of these block on model generation; async callers go through
//! `tokio::task::spawn_blocking`. None of them fail: misses become fallbacks.

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::catalog::{DifficultyModifiers, PERSONALITY_TRAITS, PERSONALITY_TYPES, PSYCHOLOGY_CATEGORIES};
use crate::domain::{PersonalityAnswer, PersonalityResult, PsychologicalQuestion, QuizQuestion, TraitAxis};
use crate::extract::{
  extract_answers, extract_correct_answer, extract_psychology_options, extract_question, PSYCHOLOGY_OPTION_PADDING,
};
use crate::personality::{confidence, derive_type, profile_view, score};
use crate::slots::SlotKind;
use crate::state::AppState;
use crate::util::{fill_template, trunc_for_log, truncate_chars};

const FALLBACK_MODEL: &str = "Fallback";
const PSYCHOLOGY_DEFAULT_QUESTION: &str = "How would you describe yourself in most situations?";
const DESCRIPTION_MIN_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 200;

#[instrument(level = "info", skip(state), fields(%category, %difficulty, %player_name))]
pub fn generate_quiz(state: &AppState, category: &str, difficulty: &str, player_name: &str) -> QuizQuestion {
  let started = Instant::now();
  let modifiers = state.catalog.modifiers(difficulty);

  if !state.slots.is_ready(SlotKind::Quiz) {
    warn!(target: "quiz", %category, "Quiz model not loaded; serving fallback question");
    return fallback_quiz(category, difficulty, modifiers);
  }

  let prompt_category = state.catalog.resolve_category(category);
  let prompt = state.prompts.quiz_prompt(prompt_category, difficulty);
  let text = state.slots.generate(SlotKind::Quiz, &prompt);
  debug!(target: "quiz", raw = %trunc_for_log(&text, 100), "Quiz model response");

  let mut question = parse_quiz(&text, category, difficulty, modifiers);
  question.ai_model = state.slots.model_label(SlotKind::Quiz);
  question.generation_time_ms = started.elapsed().as_millis() as u64;
  state.stats.record_quiz(category, question.generation_time_ms);

  info!(
    target: "quiz",
    generated = question.generated,
    ms = question.generation_time_ms,
    question = %trunc_for_log(&question.question, 50),
    "Quiz question ready"
  );
  question
}

/// Turn raw model output into a quiz record; absent fields fall back.
pub fn parse_quiz(text: &str, category: &str, difficulty: &str, modifiers: DifficultyModifiers) -> QuizQuestion {
  let mut question = extract_question(text);
  if question.is_empty() {
    question = format!("What is a fundamental concept in {category}?");
  }
  QuizQuestion {
    question,
    answers: extract_answers(text),
    correct_answer_index: extract_correct_answer(text),
    category: category.to_string(),
    difficulty: difficulty.to_string(),
    correct_answer_price_multiplier: modifiers.correct,
    wrong_answer_price_multiplier: modifiers.wrong,
    steal_chance: modifiers.steal,
    steal_percentage: modifiers.amount,
    generated: !text.trim().is_empty(),
    ai_model: String::new(),
    generation_time_ms: 0,
  }
}

fn fallback_quiz(category: &str, difficulty: &str, modifiers: DifficultyModifiers) -> QuizQuestion {
  QuizQuestion {
    question: format!("What is an important concept in {category}?"),
    answers: vec!["Concept A".into(), "Concept B".into(), "Concept C".into()],
    correct_answer_index: 0,
    category: category.to_string(),
    difficulty: difficulty.to_string(),
    correct_answer_price_multiplier: modifiers.correct,
    wrong_answer_price_multiplier: modifiers.wrong,
    steal_chance: modifiers.steal,
    steal_percentage: modifiers.amount,
    generated: false,
    ai_model: FALLBACK_MODEL.into(),
    generation_time_ms: 0,
  }
}

/// Up to `min(count, 8)` questions following the fixed category cycle.
#[instrument(level = "info", skip(state))]
pub fn generate_psychology_questions(state: &AppState, count: usize) -> Vec<PsychologicalQuestion> {
  let ready = state.slots.is_ready(SlotKind::Psychology);
  if !ready {
    warn!(target: "psychology", count, "Psychology model not loaded; serving default questions");
  }

  let mut questions = Vec::new();
  for (idx, category) in PSYCHOLOGY_CATEGORIES.iter().take(count).enumerate() {
    let started = Instant::now();
    let id = idx as u32 + 1;
    let axis = category.get(..3).and_then(TraitAxis::from_code).unwrap_or(TraitAxis::for_question(id));

    let question = if ready {
      let prompt = state.prompts.psychology_prompt(category);
      let text = state.slots.generate(SlotKind::Psychology, &prompt);
      let mut q = parse_psychology(&text, id, axis, category);
      q.ai_model = state.slots.model_label(SlotKind::Psychology);
      q.generation_time_ms = started.elapsed().as_millis() as u64;
      q
    } else {
      default_psychology(id, axis, category)
    };
    debug!(target: "psychology", id, %category, generated = question.generated, ms = question.generation_time_ms, "Psychology question ready");
    questions.push(question);
  }

  if ready {
    state.stats.record_psych_questions(questions.len() as u64);
  }
  info!(target: "psychology", requested = count, produced = questions.len(), "Psychology questionnaire ready");
  questions
}

pub fn parse_psychology(text: &str, id: u32, axis: TraitAxis, category: &str) -> PsychologicalQuestion {
  let mut question = extract_question(text);
  if question.is_empty() {
    question = PSYCHOLOGY_DEFAULT_QUESTION.to_string();
  }
  PsychologicalQuestion {
    id,
    question,
    options: extract_psychology_options(text),
    trait_axis: axis,
    category: category.to_string(),
    generated: !text.trim().is_empty(),
    ai_model: String::new(),
    generation_time_ms: 0,
  }
}

fn default_psychology(id: u32, axis: TraitAxis, category: &str) -> PsychologicalQuestion {
  PsychologicalQuestion {
    id,
    question: PSYCHOLOGY_DEFAULT_QUESTION.to_string(),
    options: PSYCHOLOGY_OPTION_PADDING.iter().map(|s| s.to_string()).collect(),
    trait_axis: axis,
    category: category.to_string(),
    generated: false,
    ai_model: FALLBACK_MODEL.into(),
    generation_time_ms: 0,
  }
}

#[instrument(level = "info", skip(state, answers), fields(answers = answers.len()))]
pub fn analyze_personality(state: &AppState, answers: &[PersonalityAnswer]) -> PersonalityResult {
  let started = Instant::now();
  let relabelled = answers
    .iter()
    .filter(|a| a.trait_code != TraitAxis::for_question(a.question_id).code())
    .count();
  if relabelled > 0 {
    debug!(target: "psychology", relabelled, "Answers scored on their positional axis instead of the declared trait");
  }
  let scores = score(answers);
  let personality_type = derive_type(&scores);
  let profile = profile_view(&state.catalog, &personality_type);

  let model_description = describe_with_model(state, &personality_type);
  let ai_generated = model_description.is_some();
  let analysis_model = if ai_generated {
    format!("MBTI + {}", state.slots.model_label(SlotKind::Analysis))
  } else {
    "MBTI".to_string()
  };

  let result = PersonalityResult {
    title: profile.title,
    description: model_description.unwrap_or(profile.description),
    scores,
    strengths: profile.strengths,
    growth_areas: profile.growth_areas,
    confidence: confidence(&scores),
    ai_generated,
    analysis_model,
    analysis_time_ms: started.elapsed().as_millis() as u64,
    personality_type,
  };
  state.stats.record_analysis();

  info!(
    target: "psychology",
    personality_type = %result.personality_type,
    title = %result.title,
    confidence = result.confidence,
    ai_generated,
    ms = result.analysis_time_ms,
    "Personality analysis complete"
  );
  result
}

/// Model-written description, used only when it says something substantial.
fn describe_with_model(state: &AppState, personality_type: &str) -> Option<String> {
  if !state.slots.is_ready(SlotKind::Analysis) {
    return None;
  }
  let prompt = fill_template(&state.prompts.analysis_template, &[("personality_type", personality_type)]);
  let text = state.slots.generate(SlotKind::Analysis, &prompt);
  let text = text.trim();
  if text.chars().count() > DESCRIPTION_MIN_CHARS {
    Some(truncate_chars(text, DESCRIPTION_MAX_CHARS))
  } else {
    debug!(target: "psychology", chars = text.len(), "Analysis model output too short; using static description");
    None
  }
}

pub fn personality_traits() -> Vec<String> {
  PERSONALITY_TRAITS.iter().map(|s| s.to_string()).collect()
}

pub fn personality_types() -> Vec<String> {
  PERSONALITY_TYPES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;
  use std::sync::Arc;

  use super::*;
  use crate::config::{ModelPaths, ServerConfig};
  use crate::slots::testing::MemoryBackend;

  const QUIZ_SCRIPT: &str = " What is the chemical symbol for gold? A) Au B) Ag C) Gd Answer:A";
  const PSYCH_SCRIPT: &str = " Do you enjoy meeting new people? A) Yes, always B) Sometimes C) Rarely";
  const ANALYSIS_SCRIPT: &str = " Strategic planners who trust logic, enjoy complex problems and prefer to work toward a long-term vision on their own terms.";

  fn state_with(scripts: &[(&str, &str)]) -> AppState {
    let cfg = ServerConfig {
      models: ModelPaths { quiz: "quiz".into(), psychology: "psych".into(), analysis: "analysis".into() },
      ..ServerConfig::default()
    };
    let state = AppState::new(cfg, Arc::new(MemoryBackend::with(scripts)));
    state.load_models();
    state
  }

  fn answers(option: u32) -> Vec<PersonalityAnswer> {
    (1..=8).map(|id| PersonalityAnswer { question_id: id, selected_option: option, value: None, trait_code: "E/I".into() }).collect()
  }

  #[test]
  fn quiz_is_parsed_from_model_output() {
    let state = state_with(&[("quiz", QUIZ_SCRIPT)]);
    for difficulty in ["Easy", "Medium", "Hard"] {
      let q = generate_quiz(&state, "Science", difficulty, "tester");
      assert_eq!(q.question, "What is the chemical symbol for gold?");
      assert_eq!(q.answers, vec!["Au", "Ag", "Gd"]);
      assert_eq!(q.correct_answer_index, 0);
      assert!(q.generated);
      assert_eq!(q.ai_model, "Quiz-Model (quiz)");
    }
    let hard = generate_quiz(&state, "Science", "Hard", "tester");
    assert_eq!(hard.steal_chance, 25.0);
    let snap = state.stats.snapshot();
    assert_eq!(snap.total_generated, 4);
  }

  #[test]
  fn quiz_without_model_is_fallback_with_modifiers() {
    let state = state_with(&[]);
    let q = generate_quiz(&state, "Technology", "Easy", "tester");
    assert_eq!(q.question, "What is an important concept in Technology?");
    assert_eq!(q.answers, vec!["Concept A", "Concept B", "Concept C"]);
    assert_eq!(q.correct_answer_index, 0);
    assert!(!q.generated);
    assert_eq!(q.ai_model, "Fallback");
    assert_eq!(q.correct_answer_price_multiplier, 0.9);
    assert_eq!(state.stats.snapshot().total_generated, 0);
  }

  #[test]
  fn unparseable_output_uses_category_default() {
    let modifiers = DifficultyModifiers { correct: 0.8, wrong: 1.3, steal: 15.0, amount: 5.0 };
    let q = parse_quiz("", "Mathematics", "Unknown", modifiers);
    assert_eq!(q.question, "What is a fundamental concept in Mathematics?");
    assert_eq!(q.answers, vec!["Option 1", "Option 2", "Option 3"]);
    assert!(q.correct_answer_index <= 2);
    assert!(!q.generated);
  }

  #[test]
  fn psychology_cycle_caps_at_eight() {
    let state = state_with(&[("psych", PSYCH_SCRIPT)]);
    let questions = generate_psychology_questions(&state, 20);
    assert_eq!(questions.len(), 8);
    let ids: Vec<u32> = questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    for axis in TraitAxis::ALL {
      assert_eq!(questions.iter().filter(|q| q.trait_axis == axis).count(), 2);
    }
    assert_eq!(questions.iter().map(|q| q.category.as_str()).collect::<HashSet<_>>().len(), 8);
    assert!(questions.iter().all(|q| q.generated && q.options == vec!["Yes, always", "Sometimes", "Rarely"]));
    assert_eq!(state.stats.psychology().total_psych_questions, 8);
  }

  #[test]
  fn psychology_without_model_returns_defaults() {
    let state = state_with(&[]);
    let questions = generate_psychology_questions(&state, 3);
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| !q.generated && q.question == PSYCHOLOGY_DEFAULT_QUESTION));
    assert_eq!(questions[2].trait_axis, TraitAxis::SN);
    assert_eq!(questions[2].category, "S/N_Information");
  }

  #[test]
  fn analysis_uses_model_description_when_substantial() {
    let state = state_with(&[("analysis", ANALYSIS_SCRIPT)]);
    let result = analyze_personality(&state, &answers(0));
    assert_eq!(result.personality_type, "ESTJ");
    assert_eq!(result.title, "The Executive");
    assert!(result.ai_generated);
    assert!(result.description.starts_with("Strategic planners"));
    assert!(result.analysis_model.starts_with("MBTI + Analysis-Model"));
    assert_eq!(state.stats.psychology().total_analyses, 1);
  }

  #[test]
  fn analysis_falls_back_to_static_description() {
    let state = state_with(&[("analysis", " Too short.")]);
    let result = analyze_personality(&state, &answers(2));
    assert_eq!(result.personality_type, "INFP");
    assert!(!result.ai_generated);
    assert_eq!(result.description, "The Mediator - Creative, caring, and guided by values.");
    assert_eq!(result.strengths, vec!["Authenticity", "Creativity", "Compassion"]);
    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
  }

  #[test]
  fn long_model_description_is_truncated() {
    let long = format!(" {}", "word ".repeat(80));
    let state = state_with(&[("analysis", long.as_str())]);
    let result = analyze_personality(&state, &answers(1));
    assert!(result.ai_generated);
    assert!(result.description.ends_with("..."));
    assert_eq!(result.description.chars().count(), 203);
  }

  #[test]
  fn static_enumerations_are_stable() {
    assert_eq!(personality_types().len(), 16);
    assert_eq!(personality_types(), personality_types());
    assert_eq!(personality_traits()[0], "Extroversion/Introversion");
  }
}
