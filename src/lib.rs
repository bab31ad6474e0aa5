//! English course backend: exercise routing, answer scoring and remedial submissions.
//!
//! - Task-type resolution to one rendering/scoring strategy
//! - Local answer normalization and scoring, optional AI evaluator with fallback
//! - Per-exercise interaction state machine (driven over WebSocket)
//! - Axum HTTP API and static SPA fallback

pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod openai;
pub mod protocol;
pub mod resolver;
pub mod routes;
pub mod scoring;
pub mod seeds;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod util;

pub use routes::build_router;
pub use state::AppState;
