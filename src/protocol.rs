//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{AnswerMap, ExerciseDefinition, ScoreResult};
use crate::resolver::{ContentStatus, Strategy};
use crate::scoring::{FeedbackTone, ItemVerdict};
use crate::session::ExercisePhase;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    LoadExercise {
        #[serde(rename = "exerciseId")]
        exercise_id: String,
    },
    Start,
    AudioFinished,
    AudioFailed,
    SetAnswer {
        key: String,
        value: String,
    },
    ClearAnswer {
        key: String,
    },
    Submit,
    /// The page's call to the submission endpoint failed; unlock answers.
    SubmissionFailed,
    ShowFeedback,
    Retry,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        #[serde(rename = "exerciseId")]
        exercise_id: String,
        strategy: Strategy,
        phase: ExercisePhase,
        answers: AnswerMap,
        missing: Vec<String>,
    },
    Result {
        result: ScoreResult,
        tone: FeedbackTone,
        items: Vec<ItemVerdict>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ExerciseSummaryOut {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub strategy: Strategy,
}

#[derive(Debug, Serialize)]
pub struct ExerciseOut {
    pub exercise: ExerciseDefinition,
    pub strategy: Strategy,
    pub audio_gated: bool,
    pub content: ContentStatus,
}

#[derive(Debug, Deserialize)]
pub struct ScoreIn {
    #[serde(default)]
    pub responses: AnswerMap,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateWritingIn {
    pub response: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub task_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WritingEvaluationOut {
    pub is_correct: bool,
    pub score: u32,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct GapFillIn {
    pub user_answer: String,
    pub correct_answer: String,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GapFillOut {
    pub is_correct: bool,
    pub is_acceptable: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemedialSubmissionIn {
    #[serde(deserialize_with = "string_or_number")]
    pub step_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub level: String,
    #[serde(deserialize_with = "string_or_number")]
    pub activity_id: String,
    #[serde(default)]
    pub responses: AnswerMap,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemedialSubmissionOut {
    pub success: bool,
    pub submission_id: String,
    pub passed: bool,
    pub score: u32,
    pub tone: FeedbackTone,
    pub next_url: String,
    pub remedial_complete: bool,
    /// True when the server graded the answers itself; false when the page's score decided.
    pub rescored: bool,
}

/// A stored submission as served to the next page.
#[derive(Debug, Serialize)]
pub struct SubmissionOut {
    pub phase: String,
    pub step_id: String,
    pub level: String,
    pub activity_id: String,
    #[serde(flatten)]
    pub outcome: RemedialSubmissionOut,
}

#[derive(Debug, Serialize)]
pub struct RemedialFeedbackOut {
    pub score: u32,
    pub tone: FeedbackTone,
    pub message: String,
    pub items: Vec<ItemVerdict>,
}

/// Step, level and activity ids arrive as either JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s.trim().to_string(),
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}
