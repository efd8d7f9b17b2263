//! Public protocol structs for the HTTP endpoints (serde ready).
//! Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::{PersonalityAnswer, PersonalityResult, PsychologicalQuestion, QuizQuestion};
use crate::slots::SlotReport;
use crate::stats::{PsychologyStats, RequestSnapshot, StatsSnapshot};

//
// Requests
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizIn {
  pub category: Option<String>,
  pub difficulty: Option<String>,
  pub player_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PsychologyIn {
  pub count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeIn {
  pub answers: Option<Vec<PersonalityAnswer>>,
}

//
// Responses
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
  pub status: &'static str,
  pub service: &'static str,
  pub version: &'static str,
  pub model_loaded: bool,
  #[serde(flatten)]
  pub requests: RequestSnapshot,
  pub timestamp: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ai_stats: Option<StatsSnapshot>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub psychology_stats: Option<PsychologyStats>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOut {
  pub success: bool,
  pub question: QuizQuestion,
  pub ai_generated: bool,
  pub ai_model: String,
  pub generation_time: u64,
  pub generation_time_unit: &'static str,
  pub server_processing_time: u64,
  pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesOut {
  pub success: bool,
  pub categories: serde_json::Map<String, serde_json::Value>,
  pub difficulties: Vec<String>,
  pub model_loaded: bool,
  pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychologyOut {
  pub success: bool,
  pub count: usize,
  pub questions: Vec<PsychologicalQuestion>,
  pub generation_time: u64,
  pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOut {
  pub success: bool,
  #[serde(flatten)]
  pub result: PersonalityResult,
  pub analysis_time: u64,
  pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitsOut {
  pub success: bool,
  pub traits: Vec<String>,
  pub types: Vec<String>,
  pub model_loaded: bool,
  pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOut {
  pub success: bool,
  pub server: RequestSnapshot,
  pub ai: AiStatsOut,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub psychology: Option<PsychologyStats>,
  pub timestamp: String,
}

/// Either live figures or a "Model not loaded" status.
#[derive(Serialize)]
#[serde(untagged)]
pub enum AiStatsOut {
  Live(LiveAiStats),
  Unavailable { status: &'static str },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAiStats {
  #[serde(flatten)]
  pub stats: StatsSnapshot,
  pub model_memory_usage: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfoOut {
  pub success: bool,
  pub model_loaded: bool,
  pub model_info: String,
  pub memory_usage: u64,
  pub loaded_models: Vec<String>,
  pub slots: Vec<SlotReport>,
  pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadOut {
  pub success: bool,
  pub model_loaded: bool,
  pub timestamp: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
  pub success: bool,
  pub error: String,
  pub timestamp: String,
}
