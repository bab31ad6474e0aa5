//! Error types for the API surface, the evaluator client and configuration loading.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures talking to the AI evaluator. Callers always recover locally.
#[derive(Debug, Error)]
pub enum EvaluatorError {
  #[error("evaluator transport error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("evaluator HTTP {status}: {message}")]
  Api { status: u16, message: String },

  #[error("JSON parse error: {0}")]
  Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io { path: String, source: std::io::Error },

  #[error("failed to parse {path}: {source}")]
  Parse { path: String, source: toml::de::Error },
}

/// Errors returned to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Bad request: {0}")]
  BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
  error: String,
  message: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error_type) = match &self {
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
    };

    let body = Json(ErrorResponse {
      error: error_type.to_string(),
      message: self.to_string(),
    });

    (status, body).into_response()
  }
}

pub type Result<T> = std::result::Result<T, ApiError>;
