//! Domain models used by the backend: exercise definitions, answer maps and score results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resolver::TaskType;

/// Learner answers keyed by slot (`g_<template>_<blank>`, `m_<pair>`, `t_<template>`).
pub type AnswerMap = BTreeMap<String, String>;

/// One term/definition row of a matching exercise.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pair {
  pub term: String,
  pub definition: String,
}

/// Declarative description of one learning activity, authored by curriculum writers.
/// Read-only once loaded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseDefinition {
  #[serde(default)]
  pub id: String,
  /// Canonicalized on the way in; see `TaskType::from_tag`.
  #[serde(rename = "type")]
  pub task_type: TaskType,
  #[serde(default)]
  pub instruction: String,
  #[serde(default)]
  pub templates: Vec<String>,
  #[serde(default)]
  pub word_bank: Vec<String>,
  #[serde(default)]
  pub pairs: Vec<Pair>,
  /// Positionally aligned with `templates`. Multi-blank templates list one answer per blank, `|`-separated.
  #[serde(default)]
  pub correct_answers: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub audio_script: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ai_evaluation_prompt: Option<String>,
  /// Length-gate threshold for open answers; falls back to the configured default.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_answer_length: Option<usize>,
}

impl ExerciseDefinition {
  pub fn new(id: impl Into<String>, task_type: TaskType) -> Self {
    Self {
      id: id.into(),
      task_type,
      instruction: String::new(),
      templates: Vec::new(),
      word_bank: Vec::new(),
      pairs: Vec::new(),
      correct_answers: Vec::new(),
      audio_script: None,
      ai_evaluation_prompt: None,
      min_answer_length: None,
    }
  }

  pub fn has_audio(&self) -> bool {
    self.audio_script.as_deref().is_some_and(|s| !s.trim().is_empty())
  }

  pub fn has_blanks(&self) -> bool {
    self.templates.iter().any(|t| count_blanks(t) > 0)
  }

  /// Reference answer for blank `blank` of template `template`, if one is configured.
  pub fn reference_for_blank(&self, template: usize, blank: usize) -> Option<String> {
    let raw = self.correct_answers.get(template)?;
    let blanks = self.templates.get(template).map(|t| count_blanks(t)).unwrap_or(1);
    let answer = if blanks <= 1 {
      (blank == 0).then(|| raw.as_str())
    } else {
      raw.split('|').nth(blank)
    }?;
    let answer = answer.trim();
    if answer.is_empty() { None } else { Some(answer.to_string()) }
  }
}

/// Number of blank markers (runs of three or more underscores) in a template.
pub fn count_blanks(template: &str) -> usize {
  let mut blanks = 0;
  let mut run = 0;
  for ch in template.chars().chain(std::iter::once(' ')) {
    if ch == '_' {
      run += 1;
    } else {
      if run >= 3 { blanks += 1; }
      run = 0;
    }
  }
  blanks
}

/// Outcome of scoring one submission attempt. Immutable once computed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
  pub score: u32,
  pub correct: usize,
  pub total: usize,
  pub percentage: f64,
  /// `false` marks an ungraded attempt: nothing in it had a reference to check against.
  pub graded: bool,
  #[serde(rename = "aiResult", default, skip_serializing_if = "Option::is_none")]
  pub ai_result: Option<serde_json::Value>,
}

impl ScoreResult {
  pub fn ungraded() -> Self {
    Self { score: 0, correct: 0, total: 0, percentage: 0.0, graded: false, ai_result: None }
  }
}
