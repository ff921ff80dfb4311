//! Process Assertion Framework
//!
//! High-level assertions that run the interpreter through the bounded runner
//! and judge how it ended: signals, exit status, captured streams and error
//! messages.

use chrono::Local;
use std::ffi::OsString;
use std::fmt;

use runner::{CaptureMode, CrashReportQuery, ExecutionOutcome, RunnerError, quote_output};
use shared::Verbosity;

use super::expected::Expected;
use super::failure::describe_failure;
use crate::context::AssertContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub success: bool,
    pub message: String,
    pub details: Option<String>,
}

impl AssertionResult {
    pub fn success(message: String) -> Self {
        Self {
            success: true,
            message,
            details: None,
        }
    }

    pub fn failure(message: String, details: Option<String>) -> Self {
        Self {
            success: false,
            message,
            details,
        }
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    /// Panic with the full description unless the assertion held
    #[track_caller]
    pub fn expect_success(&self) {
        if !self.success {
            panic!("{self}");
        }
    }
}

impl fmt::Display for AssertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(details) = &self.details {
            write!(f, "\n{details}")?;
        }
        Ok(())
    }
}

/// Run `src` through the interpreter quietly; fails if the child was killed by a signal
#[track_caller]
pub fn assert_normal_exit<'a>(
    ctx: &'a AssertContext,
    src: &'a str,
    message: Option<&'a str>,
    child_env: &'a [(&'a str, &'a str)],
) -> impl std::future::Future<Output = AssertionResult> + 'a {
    let no_args: [OsString; 0] = [];
    let invocation = ctx
        .invocation_builder(Verbosity::Silent, no_args, src, CaptureMode::Merged)
        .envs(child_env.iter().copied())
        .build();

    async move {
        tracing::info!("🔍 Asserting normal exit of {}", ctx.interpreter().path().display());
        let started_at = Local::now();
        let outcome = match ctx.runner().execute(&invocation).await {
            Ok(outcome) => outcome,
            Err(e) => return run_failure(message, e),
        };

        if outcome.status.is_signaled() {
            let crash_log = find_crash_log(ctx, &outcome, started_at).await;
            return AssertionResult::failure(
                describe_failure(
                    outcome.pid,
                    &outcome.status,
                    message,
                    &outcome.stdout_lossy(),
                    crash_log.as_deref(),
                ),
                None,
            );
        }

        AssertionResult::success(format!("pid {} {}", outcome.pid, outcome.status.describe()))
    }
}

/// Run the interpreter with `args` and compare both streams against expectations
///
/// Every mismatch is collected; they are reported together, separated by `---`.
#[track_caller]
pub fn assert_in_out_err<'a, I, S>(
    ctx: &'a AssertContext,
    args: I,
    stdin: &'a str,
    expected_stdout: &'a Expected,
    expected_stderr: &'a Expected,
    message: Option<&'a str>,
) -> impl std::future::Future<Output = AssertionResult> + 'a
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let invocation = ctx.invocation(ctx.verbosity(), args, stdin, CaptureMode::Both);

    async move {
        let started_at = Local::now();
        let outcome = match ctx.runner().execute(&invocation).await {
            Ok(outcome) => outcome,
            Err(e) => return run_failure(message, e),
        };

        // Consume any report so it cannot be attributed to a later run
        if outcome.status.is_signaled() {
            find_crash_log(ctx, &outcome, started_at).await;
        }

        let mut errors = Vec::new();
        let mut message = message;
        for (expected, actual) in [
            (expected_stdout, outcome.stdout_lossy()),
            (expected_stderr, outcome.stderr_lossy()),
        ] {
            if let Err(mismatch) = expected.check(&actual) {
                // Only the first mismatch repeats the caller's message
                match message.take() {
                    Some(message) => errors.push(format!("{message}\n{mismatch}")),
                    None => errors.push(mismatch),
                }
            }
        }

        if errors.is_empty() {
            AssertionResult::success(format!("pid {} output matched", outcome.pid))
        } else {
            AssertionResult::failure(errors.join("\n---\n"), Some(outcome.status.describe()))
        }
    }
}

/// Run the interpreter with `args`; it must not be signalled and must exit 0
#[track_caller]
pub fn assert_status_success<'a, I, S>(
    ctx: &'a AssertContext,
    args: I,
    stdin: &'a str,
    message: Option<&'a str>,
) -> impl std::future::Future<Output = AssertionResult> + 'a
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let invocation = ctx.invocation(ctx.verbosity(), args, stdin, CaptureMode::Merged);

    async move {
        let started_at = Local::now();
        let outcome = match ctx.runner().execute(&invocation).await {
            Ok(outcome) => outcome,
            Err(e) => return run_failure(message, e),
        };

        if outcome.status.is_signaled() {
            let crash_log = find_crash_log(ctx, &outcome, started_at).await;
            return AssertionResult::failure(
                describe_failure(
                    outcome.pid,
                    &outcome.status,
                    message,
                    &outcome.stdout_lossy(),
                    crash_log.as_deref(),
                ),
                None,
            );
        }

        if !outcome.success() {
            let message = message.unwrap_or("interpreter exit status is not success:");
            return AssertionResult::failure(
                format!("{message} ({})", outcome.status.describe()),
                Some(outcome.stdout_lossy()),
            );
        }

        AssertionResult::success(format!("pid {} exited successfully", outcome.pid))
    }
}

/// Signals that mean the child crashed rather than being asked to stop
const ABORT_SIGNALS: [&str; 4] = ["SIGILL", "SIGABRT", "SIGBUS", "SIGSEGV"];

/// Run `src` through the interpreter in a separate process; it must exit 0 silently
///
/// A core dump or a crash signal fails with the child's stderr quoted. Output
/// on stderr fails the assertion unless `ignore_stderr` is set.
#[track_caller]
pub fn assert_separately<'a, I, S>(
    ctx: &'a AssertContext,
    args: I,
    src: &'a str,
    ignore_stderr: bool,
    message: Option<&'a str>,
) -> impl std::future::Future<Output = AssertionResult> + 'a
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let invocation = ctx.invocation(ctx.verbosity(), args, src, CaptureMode::Both);

    async move {
        let started_at = Local::now();
        let outcome = match ctx.runner().execute(&invocation).await {
            Ok(outcome) => outcome,
            Err(e) => return run_failure(message, e),
        };
        let stderr = outcome.stderr_lossy();

        let crashed = outcome
            .status
            .signal_name()
            .is_some_and(|name| ABORT_SIGNALS.contains(&name.as_str()));
        if outcome.status.core_dumped() || crashed {
            let crash_log = find_crash_log(ctx, &outcome, started_at).await;
            return AssertionResult::failure(
                describe_failure(outcome.pid, &outcome.status, message, &stderr, crash_log.as_deref()),
                None,
            );
        }

        if !ignore_stderr && !stderr.is_empty() {
            let text = message.unwrap_or("separate run wrote to stderr:");
            return AssertionResult::failure(format!("{text}\n{}", quote_output(&stderr)), None);
        }

        if !outcome.success() {
            let text = message.unwrap_or("separate run failed:");
            return AssertionResult::failure(
                format!("{text} ({})", outcome.status.describe()),
                Some(stderr),
            );
        }

        AssertionResult::success(format!("pid {} ran separately", outcome.pid))
    }
}

/// `result` must be an error whose display text meets `expected`
pub fn assert_error_message<T, E>(result: Result<T, E>, expected: &Expected) -> AssertionResult
where
    T: fmt::Debug,
    E: fmt::Display,
{
    match result {
        Ok(value) => AssertionResult::failure(
            "Expected an error but the operation succeeded".to_string(),
            Some(format!("{value:?}")),
        ),
        Err(e) => match expected.check_text(&e.to_string()) {
            Ok(()) => AssertionResult::success(format!("error message matched: {e}")),
            Err(mismatch) => AssertionResult::failure("Unexpected error message".to_string(), Some(mismatch)),
        },
    }
}

fn run_failure(message: Option<&str>, error: RunnerError) -> AssertionResult {
    let text = match message {
        Some(message) if !message.is_empty() => format!("{message}\n{error}"),
        _ => error.to_string(),
    };
    AssertionResult::failure(text, None)
}

async fn find_crash_log(
    ctx: &AssertContext,
    outcome: &ExecutionOutcome,
    since: chrono::DateTime<Local>,
) -> Option<String> {
    let signal = outcome.status.signal_name()?;
    let query = CrashReportQuery {
        signal,
        executable: ctx
            .interpreter()
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        pid: outcome.pid,
        since,
        until: Local::now(),
    };
    ctx.crash_reports().locate(&query).await
}
