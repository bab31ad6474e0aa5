//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::{ApiError, Result};
use crate::protocol::*;
use crate::resolver::{resolve, resolve_exercise};
use crate::state::AppState;
use crate::logic;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_list_exercises(State(state): State<Arc<AppState>>) -> Json<Vec<ExerciseSummaryOut>> {
  let out: Vec<ExerciseSummaryOut> = state
    .list_exercises()
    .await
    .into_iter()
    .map(|ex| ExerciseSummaryOut {
      strategy: resolve(&ex.task_type),
      task_type: ex.task_type.as_tag().to_string(),
      id: ex.id,
    })
    .collect();
  info!(target: "course_backend", count = out.len(), "HTTP exercise list served");
  Json(out)
}

#[instrument(level = "info", skip_all, fields(%id))]
pub async fn http_get_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ExerciseOut>> {
  let exercise = state.get_exercise(&id).await.ok_or_else(|| ApiError::NotFound(format!("exercise {id}")))?;
  let resolution = resolve_exercise(&exercise);
  info!(target: "course_backend", %id, strategy = %resolution.strategy, audio_gated = resolution.audio_gated, "HTTP exercise served");
  Ok(Json(ExerciseOut {
    exercise,
    strategy: resolution.strategy,
    audio_gated: resolution.audio_gated,
    content: resolution.content,
  }))
}

#[instrument(level = "info", skip_all, fields(%id, answers = body.responses.len()))]
pub async fn http_score_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<ScoreIn>,
) -> Result<impl IntoResponse> {
  let result = logic::score_exercise_by_id(&state, &id, &body.responses).await?;
  Ok(Json(result))
}

#[instrument(level = "info", skip(state, body), fields(task_type = %body.task_type, response_len = body.response.len()))]
pub async fn http_evaluate_writing(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EvaluateWritingIn>,
) -> impl IntoResponse {
  let out = logic::evaluate_writing(&state, &body).await;
  info!(target: "scoring", is_correct = out.is_correct, score = out.score, "HTTP writing evaluated");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(answer_len = body.user_answer.len()))]
pub async fn http_validate_gap_fill(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GapFillIn>,
) -> impl IntoResponse {
  let out = logic::validate_gap_fill(&state, &body).await;
  info!(target: "scoring", is_correct = out.is_correct, is_acceptable = out.is_acceptable, "HTTP gap fill validated");
  Json(out)
}

#[instrument(level = "info", skip_all, fields(%phase, activity_id = %body.activity_id))]
pub async fn http_submit_remedial(
  State(state): State<Arc<AppState>>,
  Path(phase): Path<String>,
  Json(body): Json<RemedialSubmissionIn>,
) -> Result<Json<RemedialSubmissionOut>> {
  let out = logic::submit_remedial(&state, &phase, body).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip_all, fields(%phase, activity_id = %body.activity_id))]
pub async fn http_remedial_feedback(
  State(state): State<Arc<AppState>>,
  Path(phase): Path<String>,
  Json(body): Json<RemedialSubmissionIn>,
) -> Result<Json<RemedialFeedbackOut>> {
  let out = logic::remedial_feedback(&state, &phase, body).await?;
  info!(target: "scoring", %phase, score = out.score, items = out.items.len(), "HTTP remedial feedback served");
  Ok(Json(out))
}

#[instrument(level = "info", skip_all, fields(%id))]
pub async fn http_get_submission(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SubmissionOut>> {
  let record = state.get_submission(&id).await.ok_or_else(|| ApiError::NotFound(format!("submission {id}")))?;
  Ok(Json(SubmissionOut {
    phase: record.phase,
    step_id: record.step_id,
    level: record.level,
    activity_id: record.activity_id,
    outcome: record.outcome,
  }))
}
