//! WebSocket upgrade + message loop. Each connection owns at most one
//! `ExerciseSession`; every client message gets exactly one JSON reply.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn};

use crate::logic::ai_feedback;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::scoring::FeedbackTone;
use crate::session::{ExerciseSession, SessionError};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "course_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "course_backend", "WebSocket connected");
  let mut session: Option<ExerciseSession> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "course_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &mut session, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "course_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "course_backend", "WebSocket disconnected");
}

fn session_snapshot(s: &ExerciseSession) -> ServerWsMessage {
  ServerWsMessage::Session {
    exercise_id: s.exercise().id.clone(),
    strategy: s.resolution().strategy,
    phase: s.phase(),
    answers: s.answers().clone(),
    missing: s.missing_keys(),
  }
}

/// Apply one client message to the connection's session and build the reply.
#[instrument(level = "debug", skip(session, state))]
pub async fn handle_client_ws(
  msg: ClientWsMessage,
  session: &mut Option<ExerciseSession>,
  state: &AppState,
) -> ServerWsMessage {
  let (s, msg) = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,
    ClientWsMessage::LoadExercise { exercise_id } => {
      return match state.get_exercise(&exercise_id).await {
        Some(exercise) => {
          let loaded = session.insert(ExerciseSession::new(exercise));
          info!(target: "course_backend", id = %exercise_id, strategy = %loaded.resolution().strategy, "WS exercise loaded");
          session_snapshot(loaded)
        }
        None => ServerWsMessage::Error { message: format!("Not found: exercise {exercise_id}") },
      };
    }
    other => match session.as_mut() {
      Some(s) => (s, other),
      None => return ServerWsMessage::Error { message: "No exercise loaded".into() },
    },
  };

  match apply(s, msg, state).await {
    Ok(reply) => reply,
    Err(e) => {
      warn!(target: "course_backend", error = %e, "WS session message rejected");
      ServerWsMessage::Error { message: e.to_string() }
    }
  }
}

async fn apply(s: &mut ExerciseSession, msg: ClientWsMessage, state: &AppState) -> Result<ServerWsMessage, SessionError> {
  match msg {
    ClientWsMessage::Start => { s.start()?; }
    ClientWsMessage::AudioFinished => { s.audio_finished()?; }
    ClientWsMessage::AudioFailed => {
      warn!(target: "course_backend", id = %s.exercise().id, "Audio playback failed; opening answers");
      s.audio_failed()?;
    }
    ClientWsMessage::SetAnswer { key, value } => s.set_answer(&key, value)?,
    ClientWsMessage::ClearAnswer { key } => s.clear_answer(&key)?,
    ClientWsMessage::SubmissionFailed => { s.submission_failed()?; }
    ClientWsMessage::ShowFeedback => { s.show_feedback()?; }
    ClientWsMessage::Retry => { s.retry()?; }
    ClientWsMessage::Submit => {
      s.submit(state.scoring.default_min_answer_length)?;
      if let Some(ai) = ai_feedback(state, s.exercise(), s.answers()).await {
        s.attach_ai_result(ai);
      }
      if let Some(result) = s.result() {
        info!(target: "scoring", id = %s.exercise().id, score = result.score, graded = result.graded, "WS exercise submitted");
        return Ok(ServerWsMessage::Result {
          result: result.clone(),
          tone: FeedbackTone::for_percentage(result.percentage),
          items: s.items().to_vec(),
        });
      }
    }
    ClientWsMessage::Ping | ClientWsMessage::LoadExercise { .. } => {}
  }
  Ok(session_snapshot(s))
}
