//! Loading course configuration (evaluator prompts, scoring knobs, exercise bank) from TOML.
//!
//! See `CourseConfig`, `Prompts` and `ScoringConfig` for the expected schema:
//!
//! ```toml
//! [scoring]
//! default_min_answer_length = 10
//! pass_percentage = 80
//!
//! [submissions]
//! capacity = 1000
//!
//! [[exercises]]
//! id = "p2-s3-gap"
//! type = "fill_gaps"
//! templates = ["The ad is ___."]
//! correct_answers = ["promotional"]
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::ExerciseDefinition;
use crate::error::ConfigError;
use crate::scoring::DEFAULT_MIN_ANSWER_LENGTH;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CourseConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub scoring: ScoringConfig,
  #[serde(default)]
  pub submissions: SubmissionsConfig,
  #[serde(default)]
  pub exercises: Vec<ExerciseDefinition>,
}

/// Remedial outcomes are short-lived handoff state; only the newest `capacity` are kept.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SubmissionsConfig {
  pub capacity: usize,
}

impl Default for SubmissionsConfig {
  fn default() -> Self {
    Self { capacity: 1000 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
  /// Length-gate threshold for exercises that do not set `min_answer_length`.
  pub default_min_answer_length: usize,
  /// Remedial submissions pass at or above this percentage.
  pub pass_percentage: f64,
}

impl Default for ScoringConfig {
  fn default() -> Self {
    Self { default_min_answer_length: DEFAULT_MIN_ANSWER_LENGTH, pass_percentage: 80.0 }
  }
}

/// Prompts used by the evaluator client. Placeholders are `{name}` and filled by `fill_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub writing_eval_system: String,
  pub writing_eval_user_template: String,
  pub gap_fill_system: String,
  pub gap_fill_user_template: String,
  pub exercise_eval_system: String,
  pub exercise_eval_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      writing_eval_system: "You are a supportive but honest English writing tutor. Reply as compact JSON only.".into(),
      writing_eval_user_template: "Task type: {task_type}\nPrompt: {prompt}\nContext: {context}\nLearner response: {response}\n\nReturn JSON {\"is_correct\": boolean, \"score\": number 0-100, \"feedback\": string, \"suggestions\": [string]}. 'is_correct' = true if the response answers the prompt in understandable English.".into(),
      gap_fill_system: "You validate a learner's gap-fill answer in an English exercise. Reply as compact JSON only.".into(),
      gap_fill_user_template: "Sentence context: {context}\nExpected answer: {correct_answer}\nLearner answer: {user_answer}\n\nReturn JSON {\"is_correct\": boolean, \"is_acceptable\": boolean, \"feedback\": string}. Ignore case and punctuation. 'is_acceptable' = true for a synonym or a minor spelling slip that keeps the meaning.".into(),
      exercise_eval_system: "You evaluate a learner's answers to an English exercise. Reply as compact JSON only.".into(),
      exercise_eval_user_template: "Evaluation instructions: {instructions}\nLearner answers (JSON): {responses_json}\n\nReturn a JSON object with at least {\"feedback\": string} and any per-answer notes you find useful.".into(),
    }
  }
}

pub fn load_config(path: &str) -> Result<CourseConfig, ConfigError> {
  let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
  toml::from_str::<CourseConfig>(&text).map_err(|source| ConfigError::Parse { path: path.to_string(), source })
}

/// Attempt to load `CourseConfig` from COURSE_CONFIG_PATH. On any IO/parse error, returns None.
pub fn load_config_from_env() -> Option<CourseConfig> {
  let path = std::env::var("COURSE_CONFIG_PATH").ok()?;
  match load_config(&path) {
    Ok(cfg) => {
      info!(target: "course_backend", %path, exercises = cfg.exercises.len(), "Loaded course config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "course_backend", %path, error = %e, "Failed to load course config; using defaults");
      None
    }
  }
}
