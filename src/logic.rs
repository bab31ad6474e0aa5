//! Core behaviors shared by the HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Writing evaluation and gap-fill validation (evaluator first, local fallback)
//!   - Exercise scoring with an optional opaque AI result attached
//!   - Remedial submission and feedback (rescoring, pass/fail, next navigation)

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{AnswerMap, ExerciseDefinition, ScoreResult};
use crate::error::{ApiError, Result};
use crate::protocol::{
  EvaluateWritingIn, GapFillIn, GapFillOut, RemedialFeedbackOut, RemedialSubmissionIn, RemedialSubmissionOut,
  WritingEvaluationOut,
};
use crate::scoring::{
  keyword_overlap, normalize_answer_text, reference_keywords, score_exercise, FeedbackTone, ItemVerdict,
  NormalizeOptions, Verdict,
};
use crate::state::{AppState, SubmissionRecord};
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state, input), fields(task_type = %input.task_type, response_len = input.response.len()))]
pub async fn evaluate_writing(state: &AppState, input: &EvaluateWritingIn) -> WritingEvaluationOut {
  if let Some(oa) = &state.openai {
    match oa.evaluate_writing(&state.prompts, &input.response, &input.prompt, &input.context, &input.task_type).await {
      Ok(out) => return out,
      Err(e) => error!(target: "evaluator", error = %e, "evaluate_writing failed; using local length heuristic."),
    }
  }
  writing_fallback(&input.response, state.scoring.default_min_answer_length)
}

/// Local stand-in when the evaluator is unreachable: length decides, score grows with length.
pub fn writing_fallback(response: &str, min_length: usize) -> WritingEvaluationOut {
  let len = response.trim().chars().count();
  WritingEvaluationOut {
    is_correct: len > min_length,
    score: (len * 2).min(100) as u32,
    feedback: "unavailable".into(),
    suggestions: Vec::new(),
  }
}

#[instrument(level = "info", skip(state, input), fields(answer_len = input.user_answer.len()))]
pub async fn validate_gap_fill(state: &AppState, input: &GapFillIn) -> GapFillOut {
  if let Some(oa) = &state.openai {
    match oa.validate_gap_fill(&state.prompts, &input.user_answer, &input.correct_answer, &input.context).await {
      Ok(out) => return out,
      Err(e) => error!(target: "evaluator", error = %e, "validate_gap_fill failed; using local comparison."),
    }
  }
  gap_fill_local(&input.user_answer, &input.correct_answer)
}

/// Strict normalized equality first, then keyword overlap for longer references.
pub fn gap_fill_local(user_answer: &str, correct_answer: &str) -> GapFillOut {
  let user = normalize_answer_text(user_answer, NormalizeOptions::STRICT);
  let expected = normalize_answer_text(correct_answer, NormalizeOptions::STRICT);
  if !expected.is_empty() && user == expected {
    return GapFillOut { is_correct: true, is_acceptable: true, feedback: "Correct!".into() };
  }
  let keywords = reference_keywords(correct_answer);
  let overlap = keyword_overlap(user_answer, keywords.as_slice());
  let feedback = if overlap.is_correct {
    "Correct! Your wording differs slightly but keeps the key words."
  } else if overlap.is_acceptable {
    "Close. Some key words are missing."
  } else {
    "Not quite. Check the sentence again."
  };
  GapFillOut { is_correct: overlap.is_correct, is_acceptable: overlap.is_acceptable, feedback: feedback.into() }
}

#[instrument(level = "info", skip_all, fields(%exercise_id, answers = responses.len()))]
pub async fn score_exercise_by_id(state: &AppState, exercise_id: &str, responses: &AnswerMap) -> Result<ScoreResult> {
  let exercise = state
    .get_exercise(exercise_id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("exercise {exercise_id}")))?;
  let mut result = score_exercise(&exercise, responses, state.scoring.default_min_answer_length).result;
  result.ai_result = ai_feedback(state, &exercise, responses).await;
  info!(target: "scoring", id = %exercise_id, score = result.score, correct = result.correct, total = result.total, graded = result.graded, "Exercise scored");
  Ok(result)
}

/// Opaque evaluator feedback for exercises that carry an `ai_evaluation_prompt`.
pub async fn ai_feedback(state: &AppState, exercise: &ExerciseDefinition, responses: &AnswerMap) -> Option<serde_json::Value> {
  let instructions = exercise.ai_evaluation_prompt.as_deref()?;
  let oa = state.openai.as_ref()?;
  if responses.values().all(|v| v.trim().is_empty()) {
    return None;
  }
  let responses_json = serde_json::to_string(responses).ok()?;
  match oa.evaluate_exercise(&state.prompts, instructions, &responses_json).await {
    Ok(v) => Some(v),
    Err(e) => {
      warn!(target: "evaluator", id = %exercise.id, error = %e, "evaluate_exercise failed; returning local score only.");
      None
    }
  }
}

/// Phase path segments look like `phase2`.
pub fn parse_phase(phase: &str) -> Result<u32> {
  phase
    .strip_prefix("phase")
    .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    .and_then(|n| n.parse().ok())
    .ok_or_else(|| ApiError::BadRequest(format!("invalid phase '{phase}'")))
}

/// Server rescoring when the activity is a known, gradable exercise; otherwise the client score.
async fn resolve_submission_score(state: &AppState, body: &RemedialSubmissionIn) -> (Option<ScoreResult>, Vec<ItemVerdict>) {
  let Some(exercise) = state.get_exercise(&body.activity_id).await else {
    return (None, Vec::new());
  };
  let scored = score_exercise(&exercise, &body.responses, state.scoring.default_min_answer_length);
  if scored.result.graded {
    (Some(scored.result), scored.items)
  } else {
    (None, scored.items)
  }
}

/// Client-reported score, clamped. An attempt without any answer never earns credit.
fn client_percentage(body: &RemedialSubmissionIn) -> f64 {
  if body.responses.values().all(|v| v.trim().is_empty()) {
    return 0.0;
  }
  body.score.unwrap_or(0.0).clamp(0.0, 100.0)
}

fn next_url(phase: &str, body: &RemedialSubmissionIn, passed: bool) -> String {
  if passed {
    match body.step_id.parse::<u32>().ok().and_then(|step| step.checked_add(1)) {
      Some(next) => format!("/{phase}/step/{next}"),
      None => format!("/{phase}"),
    }
  } else {
    format!("/{phase}/step/{}/remedial/{}/{}", body.step_id, body.level, body.activity_id)
  }
}

#[instrument(level = "info", skip_all, fields(%phase, step_id = %body.step_id, level = %body.level, activity_id = %body.activity_id))]
pub async fn submit_remedial(state: &AppState, phase: &str, body: RemedialSubmissionIn) -> Result<RemedialSubmissionOut> {
  parse_phase(phase)?;

  let (server_result, _) = resolve_submission_score(state, &body).await;
  let percentage = match &server_result {
    Some(r) => {
      if let Some(client) = body.score {
        if (client - r.percentage).abs() >= 1.0 {
          debug!(target: "scoring", client, server = r.percentage, "Client score differs from server rescoring");
        }
      }
      r.percentage
    }
    None => client_percentage(&body),
  };

  let passed = percentage >= state.scoring.pass_percentage;
  let outcome = RemedialSubmissionOut {
    success: true,
    submission_id: Uuid::new_v4().to_string(),
    passed,
    score: percentage.round() as u32,
    tone: FeedbackTone::for_percentage(percentage),
    next_url: next_url(phase, &body, passed),
    remedial_complete: passed,
    rescored: server_result.is_some(),
  };

  info!(target: "scoring", submission_id = %outcome.submission_id, score = outcome.score, passed, rescored = outcome.rescored, answers = %trunc_for_log(&format!("{:?}", body.responses), 200), "Remedial submission recorded");

  state
    .record_submission(SubmissionRecord {
      phase: phase.to_string(),
      step_id: body.step_id,
      level: body.level,
      activity_id: body.activity_id,
      outcome: outcome.clone(),
    })
    .await;

  Ok(outcome)
}

#[instrument(level = "info", skip_all, fields(%phase, activity_id = %body.activity_id))]
pub async fn remedial_feedback(state: &AppState, phase: &str, body: RemedialSubmissionIn) -> Result<RemedialFeedbackOut> {
  parse_phase(phase)?;

  let (server_result, items) = resolve_submission_score(state, &body).await;
  let percentage = match server_result {
    Some(r) => r.percentage,
    None => client_percentage(&body),
  };
  let tone = FeedbackTone::for_percentage(percentage);
  let wrong = items.iter().filter(|i| i.verdict == Verdict::Incorrect).count();
  let message = if wrong == 0 {
    tone.message().to_string()
  } else {
    format!("{} {} answer(s) to revisit.", tone.message(), wrong)
  };

  Ok(RemedialFeedbackOut { score: percentage.round() as u32, tone, message, items })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::CourseConfig;
  use crate::openai::OpenAI;

  fn state_with_dead_evaluator() -> AppState {
    // Nothing listens on port 9 locally; every evaluator call fails fast.
    let oa = OpenAI::new("k", "http://127.0.0.1:9", "m").unwrap();
    AppState::from_config(CourseConfig::default(), Some(oa))
  }

  #[test]
  fn writing_fallback_boundary() {
    let ten = writing_fallback("abcdefghij", 10);
    assert!(!ten.is_correct);
    assert_eq!(ten.score, 20);
    assert_eq!(ten.feedback, "unavailable");
    assert!(writing_fallback("abcdefghijk", 10).is_correct);
    assert_eq!(writing_fallback(&"x".repeat(80), 10).score, 100);
  }

  #[tokio::test]
  async fn evaluator_outage_degrades_to_local_heuristics() {
    let state = state_with_dead_evaluator();
    let out = evaluate_writing(
      &state,
      &EvaluateWritingIn { response: "I would like to ask for Friday off.".into(), prompt: String::new(), context: String::new(), task_type: "writing".into() },
    )
    .await;
    assert!(out.is_correct);
    assert_eq!(out.feedback, "unavailable");

    let gap = validate_gap_fill(
      &state,
      &GapFillIn { user_answer: "Promotional!".into(), correct_answer: "promotional".into(), context: String::new() },
    )
    .await;
    assert!(gap.is_correct);

    let mut answers = AnswerMap::new();
    answers.insert("t_0".into(), "Dear Sam, may I take Friday off for a family event?".into());
    let scored = score_exercise_by_id(&state, "p4-s2-email", &answers).await.unwrap();
    assert_eq!(scored.score, 100);
    assert!(scored.ai_result.is_none());
  }

  #[test]
  fn gap_fill_local_tiers() {
    assert!(gap_fill_local("It's promotional.", "its promotional").is_correct);
    let partial = gap_fill_local("ethos and pathos", "ethos pathos logos");
    assert!(!partial.is_correct && partial.is_acceptable);
    let wrong = gap_fill_local("logos", "ethos pathos logos");
    assert!(!wrong.is_acceptable);
  }

  #[test]
  fn phases_must_be_numbered() {
    assert_eq!(parse_phase("phase2").unwrap(), 2);
    assert!(parse_phase("phase").is_err());
    assert!(parse_phase("phase2b").is_err());
    assert!(parse_phase("admin").is_err());
  }

  #[tokio::test]
  async fn remedial_rescoring_beats_client_score() {
    let state = AppState::default();
    let body = RemedialSubmissionIn {
      step_id: "3".into(),
      level: "a1".into(),
      activity_id: "p2-s3-remedial-a1".into(),
      responses: [("g_0_0".to_string(), "ethos".to_string()), ("g_1_0".to_string(), "logos".to_string())].into(),
      score: Some(100.0),
    };
    let out = submit_remedial(&state, "phase2", body).await.unwrap();
    assert_eq!(out.score, 50);
    assert!(!out.passed && !out.remedial_complete);
    assert_eq!(out.next_url, "/phase2/step/3/remedial/a1/p2-s3-remedial-a1");
    assert!(out.rescored);
    assert!(state.get_submission(&out.submission_id).await.is_some());
  }

  fn passing_page_submission(step_id: &str) -> RemedialSubmissionIn {
    RemedialSubmissionIn {
      step_id: step_id.into(),
      level: "b".into(),
      activity_id: "page-only".into(),
      responses: [("t_0".to_string(), "x".to_string())].into(),
      score: Some(100.0),
    }
  }

  #[tokio::test]
  async fn next_url_edges() {
    let state = AppState::default();
    let out = submit_remedial(&state, "phase2", passing_page_submission("4294967295")).await.unwrap();
    assert!(out.passed);
    assert_eq!(out.next_url, "/phase2");

    let out = submit_remedial(&state, "phase2", passing_page_submission("intro")).await.unwrap();
    assert_eq!(out.next_url, "/phase2");

    let out = submit_remedial(&state, "phase2", passing_page_submission("0")).await.unwrap();
    assert_eq!(out.next_url, "/phase2/step/1");
  }

  #[tokio::test]
  async fn ungraded_exercise_defers_to_the_page_score() {
    let mut open_gap = ExerciseDefinition::new("open-gap", crate::resolver::TaskType::GapFill);
    open_gap.templates = vec!["Say anything: ___.".into()];
    let cfg = CourseConfig { exercises: vec![open_gap], ..Default::default() };
    let state = AppState::from_config(cfg, None);

    let body = RemedialSubmissionIn {
      step_id: "2".into(),
      level: "a".into(),
      activity_id: "open-gap".into(),
      responses: [("g_0_0".to_string(), "hello".to_string())].into(),
      score: Some(90.0),
    };
    let out = submit_remedial(&state, "phase1", body).await.unwrap();
    assert_eq!(out.score, 90);
    assert!(out.passed);
    assert!(!out.rescored);
  }

  #[tokio::test]
  async fn unknown_activity_uses_clamped_client_score() {
    let state = AppState::default();
    let body = RemedialSubmissionIn {
      step_id: "7".into(),
      level: "b".into(),
      activity_id: "page-only-activity".into(),
      responses: [("t_0".to_string(), "my answer".to_string())].into(),
      score: Some(140.0),
    };
    let out = submit_remedial(&state, "phase3", body.clone()).await.unwrap();
    assert_eq!(out.score, 100);
    assert!(out.passed);
    assert_eq!(out.next_url, "/phase3/step/8");
    assert!(!out.rescored);

    let empty = RemedialSubmissionIn { responses: AnswerMap::new(), ..body };
    let out = submit_remedial(&state, "phase3", empty).await.unwrap();
    assert_eq!(out.score, 0);
    assert!(!out.passed);
  }

  #[tokio::test]
  async fn feedback_lists_items_to_revisit() {
    let state = AppState::default();
    let body = RemedialSubmissionIn {
      step_id: "3".into(),
      level: "a1".into(),
      activity_id: "p2-s3-remedial-a1".into(),
      responses: [("g_0_0".to_string(), "ethos".to_string())].into(),
      score: None,
    };
    let out = remedial_feedback(&state, "phase2", body).await.unwrap();
    assert_eq!(out.score, 50);
    assert_eq!(out.tone, FeedbackTone::Acceptable);
    assert!(out.message.ends_with("1 answer(s) to revisit."));
    assert_eq!(out.items.len(), 2);
  }
}
