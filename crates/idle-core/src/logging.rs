//! Shared logging initialization for session-idle binaries.

use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

fn parse_level(raw: &str) -> tracing::Level {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

fn level_from_env() -> tracing::Level {
    parse_level(&std::env::var("SESSION_IDLE_LOG").unwrap_or_else(|_| "info".to_string()))
}

/// Initialize process-level tracing output from `SESSION_IDLE_LOG`.
///
/// This is safe to call multiple times; only the first call initializes the
/// subscriber. It is best-effort and never returns an error.
pub fn init() {
    init_with_level(None);
}

/// Like [`init`], but `level` (when set) takes precedence over the environment.
pub fn init_with_level(level: Option<tracing::Level>) {
    if INIT.get().is_some() {
        return;
    }
    let level = level.unwrap_or_else(level_from_env);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}
