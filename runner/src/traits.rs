//! Trait definitions with mockall annotations for testing
//!
//! The runner talks to the operating system through these seams so the
//! supervision logic can be exercised with test doubles: signal delivery and
//! crash-report lookup.

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

/// Recipient of a termination signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillTarget {
    /// A single process id
    Process(i32),
    /// Every member of a process group
    Group(i32),
}

impl KillTarget {
    /// Raw id for `kill(2)`: the pid, or the negated group id
    pub fn raw(&self) -> i32 {
        match self {
            KillTarget::Process(pid) => *pid,
            KillTarget::Group(pgid) => -pgid,
        }
    }
}

impl fmt::Display for KillTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillTarget::Process(pid) => write!(f, "pid {pid}"),
            KillTarget::Group(pgid) => write!(f, "process group {pgid}"),
        }
    }
}

/// Signals the supervisor escalates through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermSignal {
    /// Polite request to exit
    Terminate,
    /// Forceful, cannot be caught or ignored
    Kill,
}

impl TermSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermSignal::Terminate => "SIGTERM",
            TermSignal::Kill => "SIGKILL",
        }
    }
}

impl fmt::Display for TermSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a signal could not be delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The target is already gone
    NoSuchProcess,
    /// Anything else (permissions, unsupported platform, ...)
    Failed(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::NoSuchProcess => write!(f, "no such process"),
            DeliveryError::Failed(reason) => f.write_str(reason),
        }
    }
}

/// Signal delivery abstraction
#[mockall::automock]
pub trait SignalSender: Send + Sync {
    /// Deliver `signal` to `target`
    fn send(&self, target: KillTarget, signal: TermSignal) -> Result<(), DeliveryError>;
}

/// What a crash-report lookup is keyed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReportQuery {
    /// Symbolic terminating signal, e.g. `SIGSEGV`
    pub signal: String,
    /// Executable basename as it appears in the report
    pub executable: String,
    pub pid: u32,
    /// Reports stamped inside this window are candidates
    pub since: DateTime<Local>,
    pub until: DateTime<Local>,
}

/// Crash-report recovery abstraction
///
/// A locator returns the text of the report written by the platform for the
/// queried process, removing the report once read.
#[mockall::automock]
#[async_trait::async_trait]
pub trait CrashReportLocator: Send + Sync {
    async fn locate(&self, query: &CrashReportQuery) -> Option<String>;
}

#[async_trait::async_trait]
impl<T: CrashReportLocator + ?Sized> CrashReportLocator for Arc<T> {
    async fn locate(&self, query: &CrashReportQuery) -> Option<String> {
        (**self).locate(query).await
    }
}
