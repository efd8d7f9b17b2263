//! Service configuration: model paths, sampling defaults and prompt templates.
//!
//! Everything has a built-in default. An optional TOML file (AEON_CONFIG_PATH)
//! can override any section, and a few env variables override the model paths.
//!
//! Example:
//!
//! ```toml
//! [models]
//! quiz = "models/quiz.script"
//!
//! [sampling]
//! temperature = 0.5
//! max_tokens = 96
//!
//! [prompts]
//! analysis_template = "Describe {personality_type}. Key traits:"
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::catalog::{DEFAULT_CATEGORY, DEFAULT_DIFFICULTY};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServerConfig {
  #[serde(default)]
  pub models: ModelPaths,
  #[serde(default)]
  pub sampling: SamplingDefaults,
  #[serde(default)]
  pub prompts: Prompts,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
  pub quiz: PathBuf,
  pub psychology: PathBuf,
  pub analysis: PathBuf,
}

impl Default for ModelPaths {
  fn default() -> Self {
    Self {
      quiz: "models/quiz.script".into(),
      psychology: "models/psychology.script".into(),
      analysis: "models/analysis.script".into(),
    }
  }
}

/// Initial sampling values; they go through the clamping setters on startup.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct SamplingDefaults {
  pub temperature: f32,
  pub max_tokens: usize,
  pub context_size: usize,
}

impl Default for SamplingDefaults {
  fn default() -> Self {
    Self { temperature: 0.7, max_tokens: 128, context_size: 1024 }
  }
}

/// Prompt templates fed to the model slots.
/// `{personality_type}` is substituted in `analysis_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// category -> difficulty -> prompt
  pub quiz: HashMap<String, HashMap<String, String>>,
  /// psychology category (e.g. "E/I_Social") -> prompt
  pub psychology: HashMap<String, String>,
  pub psychology_fallback: String,
  pub analysis_template: String,
}

const QUIZ_FORMAT: &str = "Question: [question]? A) [option1] B) [option2] C) [option3] Answer: [A/B/C]\nQuestion:";

impl Default for Prompts {
  fn default() -> Self {
    let topics = [
      ("Science", "science"),
      ("Technology", "tech"),
      ("Mathematics", "math"),
      ("Engineering", "engineering"),
    ];
    let mut quiz = HashMap::new();
    for (category, topic) in topics {
      let plain_article = if topic.starts_with('e') { "an" } else { "a" };
      let by_difficulty = HashMap::from([
        ("Easy".to_string(), format!("Create a basic {topic} question with 3 options. {QUIZ_FORMAT}")),
        ("Medium".to_string(), format!("Create {plain_article} {topic} question with 3 options. {QUIZ_FORMAT}")),
        ("Hard".to_string(), format!("Create an advanced {topic} question with 3 options. {QUIZ_FORMAT}")),
      ]);
      quiz.insert(category.to_string(), by_difficulty);
    }

    let psych = |about: &str, a: &str, c: &str| {
      format!("Create a personality question about {about}. Question: [question]? A) [{a}] B) [neutral] C) [{c}]\nQuestion:")
    };
    let psychology = HashMap::from([
      ("E/I_Social".to_string(), psych("social preferences", "extroverted", "introverted")),
      ("E/I_Energy".to_string(), psych("energy and social recharging", "extroverted", "introverted")),
      ("S/N_Information".to_string(), psych("information processing", "sensing", "intuition")),
      ("S/N_Future".to_string(), psych("future planning", "sensing", "intuition")),
      ("T/F_Decisions".to_string(), psych("decision making", "thinking", "feeling")),
      ("T/F_Conflict".to_string(), psych("handling conflict", "thinking", "feeling")),
      ("J/P_Structure".to_string(), psych("structure and organization", "judging", "perceiving")),
      ("J/P_Deadlines".to_string(), psych("deadlines and time management", "judging", "perceiving")),
    ]);

    Self {
      quiz,
      psychology,
      psychology_fallback: "Create a personality question with 3 options. Question: [question]? A) [option1] B) [option2] C) [option3]\nQuestion:".into(),
      analysis_template: "Describe {personality_type} personality type. Key traits and characteristics:".into(),
    }
  }
}

impl Prompts {
  /// Quiz prompt; unknown categories use Science, unknown difficulties use Medium.
  pub fn quiz_prompt(&self, category: &str, difficulty: &str) -> String {
    let by_difficulty = self.quiz.get(category).or_else(|| self.quiz.get(DEFAULT_CATEGORY));
    by_difficulty
      .and_then(|m| m.get(difficulty).or_else(|| m.get(DEFAULT_DIFFICULTY)))
      .cloned()
      .unwrap_or_else(|| format!("Create a question with 3 options. {QUIZ_FORMAT}"))
  }

  pub fn psychology_prompt(&self, category: &str) -> String {
    self
      .psychology
      .get(category)
      .cloned()
      .unwrap_or_else(|| self.psychology_fallback.clone())
  }
}

/// Listen address, env only.
#[derive(Clone, Debug)]
pub struct ListenConfig {
  pub host: String,
  pub port: u16,
}

impl ListenConfig {
  pub fn from_env() -> Self {
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(8080);
    Self { host, port }
  }
}

/// Load config from AEON_CONFIG_PATH (if set) and apply model path env overrides.
/// IO and parse errors are logged and the defaults are used instead.
pub fn load_server_config_from_env() -> ServerConfig {
  let mut cfg = match std::env::var("AEON_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match toml::from_str::<ServerConfig>(&s) {
        Ok(cfg) => {
          info!(target: "aeon_backend", %path, "Loaded server config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "aeon_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
          ServerConfig::default()
        }
      },
      Err(e) => {
        error!(target: "aeon_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
        ServerConfig::default()
      }
    },
    Err(_) => ServerConfig::default(),
  };

  if let Ok(p) = std::env::var("QUIZ_MODEL_PATH") {
    cfg.models.quiz = p.into();
  }
  if let Ok(p) = std::env::var("PSYCHOLOGY_MODEL_PATH") {
    cfg.models.psychology = p.into();
  }
  if let Ok(p) = std::env::var("ANALYSIS_MODEL_PATH") {
    cfg.models.analysis = p.into();
  }
  cfg
}
