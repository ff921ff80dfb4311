//! Service implementations
//!
//! Everything here touches the operating system: spawning, pipes, signals
//! and the crash-report directory.

pub mod collector;
pub mod crash_reports;
pub mod launcher;
pub mod signals;
pub mod writer;

#[cfg(test)]
mod tests;

pub use collector::{CapturedOutput, Collector, CollectorResult, CollectorSet, CollectorStatus, StreamKind};
pub use crash_reports::{DiagnosticReports, NoCrashReports, default_crash_report_locator};
pub use launcher::{ChildHandle, OutputPipe, launch};
pub use signals::NixSignalSender;
