//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Model-bound work runs on the blocking pool; every handler counts the request.

use std::sync::Arc;
use std::time::Instant;

use axum::{
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::catalog::{DEFAULT_CATEGORY, DEFAULT_DIFFICULTY, DIFFICULTIES};
use crate::logic::{analyze_personality, generate_psychology_questions, generate_quiz, personality_traits, personality_types};
use crate::protocol::*;
use crate::state::AppState;

const SERVICE_NAME: &str = "Aeon Quiz & Psychology API";
const MAX_PSYCHOLOGY_COUNT: i64 = 16;
const DEFAULT_PSYCHOLOGY_COUNT: i64 = 8;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("internal error: {0}")]
  Internal(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      error!(target: "aeon_backend", error = %self, "Request failed");
    } else {
      warn!(target: "aeon_backend", error = %self, "Rejected request");
    }
    let body = ErrorOut { success: false, error: self.to_string(), timestamp: timestamp() };
    (status, Json(body)).into_response()
  }
}

pub fn timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Empty bodies mean "all defaults"; anything else must be valid JSON.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(T::default());
  }
  serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

/// Run core logic on the blocking pool.
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
  T: Send + 'static,
  F: FnOnce(&AppState) -> T + Send + 'static,
{
  let state = state.clone();
  tokio::task::spawn_blocking(move || f(&state))
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.requests.request();
  let loaded = state.models_loaded();
  Json(HealthOut {
    status: "healthy",
    service: SERVICE_NAME,
    version: env!("CARGO_PKG_VERSION"),
    model_loaded: loaded,
    requests: state.requests.snapshot(),
    timestamp: timestamp(),
    ai_stats: loaded.then(|| state.stats.snapshot()),
    psychology_stats: loaded.then(|| state.stats.psychology()),
  })
}

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_generate_quiz(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<QuizOut>, ApiError> {
  state.requests.request();
  let started = Instant::now();
  let req: QuizIn = parse_body(&body)?;
  let category = req.category.unwrap_or_else(|| DEFAULT_CATEGORY.into());
  let difficulty = req.difficulty.unwrap_or_else(|| DEFAULT_DIFFICULTY.into());
  let player = req.player_name.unwrap_or_else(|| "Unknown".into());

  let question = blocking(&state, move |s| generate_quiz(s, &category, &difficulty, &player)).await?;
  state.requests.generation(question.generated);
  info!(target: "quiz", generated = question.generated, category = %question.category, "HTTP quiz served");

  Ok(Json(QuizOut {
    success: true,
    ai_generated: question.generated,
    ai_model: question.ai_model.clone(),
    generation_time: question.generation_time_ms,
    generation_time_unit: "ms",
    server_processing_time: started.elapsed().as_millis() as u64,
    timestamp: timestamp(),
    question,
  }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.requests.request();
  let categories = state
    .catalog
    .categories_map()
    .into_iter()
    .map(|(cat, subs)| (cat, serde_json::Value::from(subs)))
    .collect();
  Json(CategoriesOut {
    success: true,
    categories,
    difficulties: DIFFICULTIES.iter().map(|d| d.to_string()).collect(),
    model_loaded: state.models_loaded(),
    timestamp: timestamp(),
  })
}

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_generate_psychology(
  State(state): State<Arc<AppState>>,
  body: Bytes,
) -> Result<Json<PsychologyOut>, ApiError> {
  state.requests.request();
  let started = Instant::now();
  let req: PsychologyIn = parse_body(&body)?;
  let count = req.count.unwrap_or(DEFAULT_PSYCHOLOGY_COUNT);
  if !(1..=MAX_PSYCHOLOGY_COUNT).contains(&count) {
    return Err(ApiError::BadRequest(format!("Count must be between 1 and {MAX_PSYCHOLOGY_COUNT}")));
  }

  let questions = blocking(&state, move |s| generate_psychology_questions(s, count as usize)).await?;
  state.requests.generation(questions.iter().any(|q| q.generated));
  info!(target: "psychology", requested = count, produced = questions.len(), "HTTP psychology questions served");

  Ok(Json(PsychologyOut {
    success: true,
    count: questions.len(),
    questions,
    generation_time: started.elapsed().as_millis() as u64,
    timestamp: timestamp(),
  }))
}

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_analyze_personality(
  State(state): State<Arc<AppState>>,
  body: Bytes,
) -> Result<Json<AnalyzeOut>, ApiError> {
  state.requests.request();
  let started = Instant::now();
  let req: AnalyzeIn = parse_body(&body)?;
  let answers = match req.answers {
    Some(a) if !a.is_empty() => a,
    Some(_) => return Err(ApiError::BadRequest("No answers provided".into())),
    None => return Err(ApiError::BadRequest("Answers array is required".into())),
  };

  let result = blocking(&state, move |s| analyze_personality(s, &answers)).await?;
  info!(target: "psychology", personality_type = %result.personality_type, "HTTP analysis served");

  Ok(Json(AnalyzeOut {
    success: true,
    result,
    analysis_time: started.elapsed().as_millis() as u64,
    timestamp: timestamp(),
  }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_traits(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.requests.request();
  Json(TraitsOut {
    success: true,
    traits: personality_traits(),
    types: personality_types(),
    model_loaded: state.models_loaded(),
    timestamp: timestamp(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.requests.request();
  let loaded = state.models_loaded();
  let ai = if loaded {
    AiStatsOut::Live(LiveAiStats { stats: state.stats.snapshot(), model_memory_usage: state.slots.memory_usage() })
  } else {
    AiStatsOut::Unavailable { status: "Model not loaded" }
  };
  Json(StatsOut {
    success: true,
    server: state.requests.snapshot(),
    ai,
    psychology: loaded.then(|| state.stats.psychology()),
    timestamp: timestamp(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_model_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  state.requests.request();
  Json(ModelInfoOut {
    success: true,
    model_loaded: state.models_loaded(),
    model_info: state.slots.model_info(),
    memory_usage: state.slots.memory_usage(),
    loaded_models: state.slots.loaded_models(),
    slots: state.slots.reports(),
    timestamp: timestamp(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_reload_models(State(state): State<Arc<AppState>>) -> Result<Json<ReloadOut>, ApiError> {
  state.requests.request();
  let success = blocking(&state, |s| s.slots.reload_all()).await?;
  info!(target: "aeon_backend", success, "Model reload finished");
  Ok(Json(ReloadOut { success, model_loaded: state.models_loaded(), timestamp: timestamp() }))
}
