//! Bounded subprocess runner
//!
//! Runs one child process under a wall-clock budget, optionally feeding it
//! stdin and capturing its output. A child still running when the budget
//! expires is sent a terminate signal, then a kill signal after a grace
//! period, and is always reaped before the call returns. Partial output and
//! any crash report the platform left behind are attached to the resulting
//! timeout failure.

#[cfg(not(unix))]
compile_error!("the runner supports Unix platforms only");

pub mod core;
pub mod error;
pub mod invocation;
pub mod outcome;
pub mod runner;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use crate::core::{PlatformClass, SignalPolicy};
pub use error::{RunnerError, RunnerResult, TimeoutFailure};
pub use invocation::{CaptureMode, Invocation, InvocationBuilder, ProcessGroup};
pub use outcome::{ExecutionOutcome, ExitDisposition, quote_output, signal_name};
pub use runner::{Runner, SystemRunner};
pub use services::StreamKind;
pub use traits::{CrashReportLocator, CrashReportQuery, DeliveryError, KillTarget, SignalSender, TermSignal};

/// Run `invocation` with real signals and this platform's crash reports
pub async fn execute(invocation: &Invocation) -> RunnerResult<ExecutionOutcome> {
    SystemRunner::system().execute(invocation).await
}
