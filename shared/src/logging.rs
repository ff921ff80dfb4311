//! Shared logging utilities for consistent tracing across the harness crates

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Crates whose events pass the filter built by [`filter_directives`]
const HARNESS_CRATES: &[&str] = &["runner", "shared", "tester"];

/// Build the `EnvFilter` directive string for a base level
pub fn filter_directives(level: &str) -> String {
    HARNESS_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize tracing subscriber with an optional log level (defaults to `info`)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::new(filter_directives(base_level));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for child-process-aware info logging
#[macro_export]
macro_rules! process_info {
    ($pid:expr, $($arg:tt)*) => {
        tracing::info!(
            pid = %$pid,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for child-process-aware warning logging
#[macro_export]
macro_rules! process_warn {
    ($pid:expr, $($arg:tt)*) => {
        tracing::warn!(
            pid = %$pid,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for child-process-aware error logging
#[macro_export]
macro_rules! process_error {
    ($pid:expr, $($arg:tt)*) => {
        tracing::error!(
            pid = %$pid,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for child-process-aware debug logging
#[macro_export]
macro_rules! process_debug {
    ($pid:expr, $($arg:tt)*) => {
        tracing::debug!(
            pid = %$pid,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for a freshly spawned child
pub fn log_spawned(pid: u32, program: &str) {
    info!(
        pid = %pid,
        timestamp = format_timestamp(),
        "🚀 Spawned {}",
        program
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(pid: u32, context: &str, error: &dyn std::fmt::Display) {
    error!(
        pid = %pid,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}
