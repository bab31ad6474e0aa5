//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

const STATIC_DIR: &str = "./static";

/// Full application router: API, `/ws`, CORS and request tracing, then the SPA fallback.
pub fn build_router(state: Arc<AppState>) -> Router {
    let frontend = ServeDir::new(STATIC_DIR)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{STATIC_DIR}/index.html")));

    api_routes()
        .route("/ws", get(ws::ws_upgrade))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .fallback_service(frontend)
}

/// JSON endpoints under `/api`. Static segments take precedence over `:phase`.
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(http::http_health))
        // exercise bank + scoring
        .route("/api/exercises", get(http::http_list_exercises))
        .route("/api/exercises/:id", get(http::http_get_exercise))
        .route("/api/exercises/:id/score", post(http::http_score_exercise))
        // evaluator-backed checks
        .route("/api/evaluate-writing", post(http::http_evaluate_writing))
        .route("/api/validate-gap-fill", post(http::http_validate_gap_fill))
        // remedial flow
        .route("/api/submissions/:id", get(http::http_get_submission))
        .route("/api/:phase/submit-remedial", post(http::http_submit_remedial))
        .route("/api/:phase/remedial/feedback", post(http::http_remedial_feedback))
}
