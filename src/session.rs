//! Per-exercise interaction state machine.
//!
//! `Idle -> AudioGate -> Answering -> Submitted -> Feedback`, with `AudioGate`
//! only entered for listening exercises that carry an audio script, and a
//! retry loop from `Feedback` back to `Answering`. Each session exclusively
//! owns its answer map.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{AnswerMap, ExerciseDefinition, ScoreResult};
use crate::resolver::{resolve_exercise, Resolution};
use crate::scoring::{answer_slots, score_exercise, ItemVerdict};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExercisePhase {
  Idle,
  AudioGate,
  Answering,
  Submitted,
  Feedback,
}

impl ExercisePhase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Idle => "idle",
      Self::AudioGate => "audio_gate",
      Self::Answering => "answering",
      Self::Submitted => "submitted",
      Self::Feedback => "feedback",
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
  #[error("cannot {action} while {phase}")]
  InvalidTransition { phase: &'static str, action: &'static str },

  #[error("answers missing for: {}", .missing.join(", "))]
  Incomplete { missing: Vec<String> },

  #[error("unknown answer key: {0}")]
  UnknownKey(String),
}

pub struct ExerciseSession {
  exercise: ExerciseDefinition,
  resolution: Resolution,
  required_keys: Vec<String>,
  phase: ExercisePhase,
  answers: AnswerMap,
  result: Option<ScoreResult>,
  items: Vec<ItemVerdict>,
}

impl ExerciseSession {
  pub fn new(exercise: ExerciseDefinition) -> Self {
    let resolution = resolve_exercise(&exercise);
    let required_keys = answer_slots(&exercise, resolution.strategy).into_iter().map(|s| s.key).collect();
    Self {
      exercise,
      resolution,
      required_keys,
      phase: ExercisePhase::Idle,
      answers: AnswerMap::new(),
      result: None,
      items: Vec::new(),
    }
  }

  pub fn exercise(&self) -> &ExerciseDefinition { &self.exercise }
  pub fn resolution(&self) -> Resolution { self.resolution }
  pub fn phase(&self) -> ExercisePhase { self.phase }
  pub fn answers(&self) -> &AnswerMap { &self.answers }
  pub fn required_keys(&self) -> &[String] { &self.required_keys }
  pub fn result(&self) -> Option<&ScoreResult> { self.result.as_ref() }
  pub fn items(&self) -> &[ItemVerdict] { &self.items }

  fn expect_phase(&self, phase: ExercisePhase, action: &'static str) -> Result<(), SessionError> {
    if self.phase == phase {
      Ok(())
    } else {
      Err(SessionError::InvalidTransition { phase: self.phase.as_str(), action })
    }
  }

  pub fn start(&mut self) -> Result<ExercisePhase, SessionError> {
    self.expect_phase(ExercisePhase::Idle, "start")?;
    self.phase = if self.resolution.audio_gated { ExercisePhase::AudioGate } else { ExercisePhase::Answering };
    Ok(self.phase)
  }

  pub fn audio_finished(&mut self) -> Result<ExercisePhase, SessionError> {
    self.expect_phase(ExercisePhase::AudioGate, "finish audio")?;
    self.phase = ExercisePhase::Answering;
    Ok(self.phase)
  }

  /// Playback failure also releases the gate; the learner must not be stuck.
  pub fn audio_failed(&mut self) -> Result<ExercisePhase, SessionError> {
    self.expect_phase(ExercisePhase::AudioGate, "fail audio")?;
    self.phase = ExercisePhase::Answering;
    Ok(self.phase)
  }

  pub fn set_answer(&mut self, key: &str, value: impl Into<String>) -> Result<(), SessionError> {
    self.expect_phase(ExercisePhase::Answering, "answer")?;
    if !self.required_keys.iter().any(|k| k == key) {
      return Err(SessionError::UnknownKey(key.to_string()));
    }
    self.answers.insert(key.to_string(), value.into());
    Ok(())
  }

  pub fn clear_answer(&mut self, key: &str) -> Result<(), SessionError> {
    self.expect_phase(ExercisePhase::Answering, "clear an answer")?;
    self.answers.remove(key);
    Ok(())
  }

  pub fn missing_keys(&self) -> Vec<String> {
    self
      .required_keys
      .iter()
      .filter(|k| self.answers.get(*k).map_or(true, |v| v.trim().is_empty()))
      .cloned()
      .collect()
  }

  pub fn is_complete(&self) -> bool {
    self.missing_keys().is_empty()
  }

  /// Score the attempt and lock the answers. Only allowed once every required slot is filled.
  pub fn submit(&mut self, default_min_length: usize) -> Result<&ScoreResult, SessionError> {
    self.expect_phase(ExercisePhase::Answering, "submit")?;
    let missing = self.missing_keys();
    if !missing.is_empty() {
      return Err(SessionError::Incomplete { missing });
    }
    let scored = score_exercise(&self.exercise, &self.answers, default_min_length);
    self.items = scored.items;
    self.phase = ExercisePhase::Submitted;
    let result: &ScoreResult = self.result.insert(scored.result);
    Ok(result)
  }

  /// Submission transport failed: unlock without losing work.
  pub fn submission_failed(&mut self) -> Result<ExercisePhase, SessionError> {
    self.expect_phase(ExercisePhase::Submitted, "report a failed submission")?;
    self.result = None;
    self.items.clear();
    self.phase = ExercisePhase::Answering;
    Ok(self.phase)
  }

  pub fn attach_ai_result(&mut self, ai_result: serde_json::Value) {
    if let Some(r) = self.result.as_mut() {
      r.ai_result = Some(ai_result);
    }
  }

  pub fn show_feedback(&mut self) -> Result<ExercisePhase, SessionError> {
    self.expect_phase(ExercisePhase::Submitted, "show feedback")?;
    self.phase = ExercisePhase::Feedback;
    Ok(self.phase)
  }

  pub fn retry(&mut self) -> Result<ExercisePhase, SessionError> {
    self.expect_phase(ExercisePhase::Feedback, "retry")?;
    self.answers.clear();
    self.result = None;
    self.items.clear();
    self.phase = ExercisePhase::Answering;
    Ok(self.phase)
  }
}
