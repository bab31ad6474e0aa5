//! Tracing setup for the binary.
//!
//! - LOG_LEVEL is an `EnvFilter` directive string, e.g.
//!   "info,scoring=debug,evaluator=debug,tower_http=info".
//! - LOG_FORMAT picks "pretty" (default) or "json" output.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,course_backend=debug,scoring=debug,evaluator=info,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Anything other than "json" (case-insensitive) keeps the human-readable format.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Builder types differ per format, so each arm finishes its own.
    let installed = match format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Pretty => subscriber.try_init(),
    };
    if installed.is_ok() {
        tracing::debug!(target: "course_backend", ?format, "Tracing initialized");
    }
}
