//! Minimal OpenAI-compatible client for answer evaluation.
//!
//! We only call chat.completions and request a strict JSON object back.
//! Calls are instrumented and log model names, latencies and response sizes (not contents).
//!
//! NOTE: We never log the API key. Every caller treats an `Err` as "evaluator
//! unavailable" and falls back to local scoring.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::Prompts;
use crate::error::EvaluatorError;
use crate::protocol::{GapFillOut, WritingEvaluationOut};
use crate::util::fill_template;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    match Self::new(api_key, base_url, model) {
      Ok(oa) => Some(oa),
      Err(e) => {
        warn!(target: "evaluator", error = %e, "Failed to build HTTP client; evaluator disabled");
        None
      }
    }
  }

  pub fn new(
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    model: impl Into<String>,
  ) -> Result<Self, EvaluatorError> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      model: model.into(),
    })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(&self, system: &str, user: &str) -> Result<T, EvaluatorError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: 0.2,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "english-course-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(EvaluatorError::Api { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(target: "evaluator", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Evaluator usage");
    }
    let text = body.choices.first().and_then(|c| c.message.content.clone()).unwrap_or_default();
    info!(target: "evaluator", elapsed = ?start.elapsed(), response_len = text.len(), "Evaluator response received");

    Ok(serde_json::from_str::<T>(&text)?)
  }

  #[instrument(level = "info", skip_all, fields(%task_type, response_len = response.len()))]
  pub async fn evaluate_writing(
    &self,
    prompts: &Prompts,
    response: &str,
    prompt: &str,
    context: &str,
    task_type: &str,
  ) -> Result<WritingEvaluationOut, EvaluatorError> {
    #[derive(Deserialize)]
    struct Eval {
      is_correct: bool,
      score: f64,
      #[serde(default)]
      feedback: String,
      #[serde(default)]
      suggestions: Vec<String>,
    }

    let user = fill_template(
      &prompts.writing_eval_user_template,
      &[("task_type", task_type), ("prompt", prompt), ("context", context), ("response", response)],
    );
    let e: Eval = self.chat_json(&prompts.writing_eval_system, &user).await?;
    Ok(WritingEvaluationOut {
      is_correct: e.is_correct,
      score: e.score.clamp(0.0, 100.0).round() as u32,
      feedback: e.feedback,
      suggestions: e.suggestions,
    })
  }

  #[instrument(level = "info", skip_all, fields(answer_len = user_answer.len()))]
  pub async fn validate_gap_fill(
    &self,
    prompts: &Prompts,
    user_answer: &str,
    correct_answer: &str,
    context: &str,
  ) -> Result<GapFillOut, EvaluatorError> {
    #[derive(Deserialize)]
    struct Val {
      is_correct: bool,
      #[serde(default)]
      is_acceptable: bool,
      #[serde(default)]
      feedback: String,
    }

    let user = fill_template(
      &prompts.gap_fill_user_template,
      &[("user_answer", user_answer), ("correct_answer", correct_answer), ("context", context)],
    );
    let v: Val = self.chat_json(&prompts.gap_fill_system, &user).await?;
    Ok(GapFillOut {
      is_correct: v.is_correct,
      is_acceptable: v.is_correct || v.is_acceptable,
      feedback: v.feedback,
    })
  }

  /// Free-form evaluation driven by an exercise's `ai_evaluation_prompt`. The result is opaque.
  #[instrument(level = "info", skip_all, fields(instructions_len = instructions.len()))]
  pub async fn evaluate_exercise(
    &self,
    prompts: &Prompts,
    instructions: &str,
    responses_json: &str,
  ) -> Result<serde_json::Value, EvaluatorError> {
    let user = fill_template(
      &prompts.exercise_eval_user_template,
      &[("instructions", instructions), ("responses_json", responses_json)],
    );
    self.chat_json(&prompts.exercise_eval_system, &user).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
      "choices": [{"message": {"role": "assistant", "content": content}, "index": 0}],
      "usage": {"prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55}
    })
  }

  #[tokio::test]
  async fn evaluates_writing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("Authorization", "Bearer test-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(
        r#"{"is_correct": true, "score": 104.6, "feedback": "Clear and polite.", "suggestions": ["Add a closing line."]}"#,
      )))
      .mount(&server)
      .await;

    let oa = OpenAI::new("test-key", server.uri(), "test-model").unwrap();
    let out = oa
      .evaluate_writing(&Prompts::default(), "Dear team, thanks for the update.", "Reply to the email", "", "writing")
      .await
      .unwrap();
    assert!(out.is_correct);
    assert_eq!(out.score, 100);
    assert_eq!(out.suggestions, vec!["Add a closing line.".to_string()]);
  }

  #[tokio::test]
  async fn correct_gap_fill_is_also_acceptable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"is_correct": true, "feedback": "ok"}"#)))
      .mount(&server)
      .await;

    let oa = OpenAI::new("k", format!("{}/", server.uri()), "m").unwrap();
    let out = oa.validate_gap_fill(&Prompts::default(), "went", "went", "I ___ home.").await.unwrap();
    assert!(out.is_correct && out.is_acceptable);
  }

  #[tokio::test]
  async fn api_errors_surface_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error": {"message": "slow down"}}"#))
      .mount(&server)
      .await;

    let oa = OpenAI::new("k", server.uri(), "m").unwrap();
    let err = oa.evaluate_exercise(&Prompts::default(), "judge", "{}").await.unwrap_err();
    match err {
      EvaluatorError::Api { status, message } => {
        assert_eq!(status, 429);
        assert_eq!(message, "slow down");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn non_json_content_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(200).set_body_json(completion("not json")))
      .mount(&server)
      .await;

    let oa = OpenAI::new("k", server.uri(), "m").unwrap();
    let err = oa.validate_gap_fill(&Prompts::default(), "a", "b", "").await.unwrap_err();
    assert!(matches!(err, EvaluatorError::Decode(_)));
  }
}
