//! Runner-specific error types

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::outcome::{ExitDisposition, quote_output};
use crate::services::collector::StreamKind;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create output pipe: {source}")]
    Pipe {
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Timeout(Box<TimeoutFailure>),

    #[error("pid {pid} did not exit after {signal}: {source}")]
    Escalation {
        pid: u32,
        signal: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver {signal} to {target}: {reason}")]
    Signal {
        signal: String,
        target: String,
        reason: String,
    },

    #[error("Failed reading child {stream}: {source}")]
    StreamRead {
        stream: StreamKind,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed writing child stdin: {source}")]
    StdinWrite {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for pid {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Timeout details when this error is a timeout
    pub fn as_timeout(&self) -> Option<&TimeoutFailure> {
        match self {
            RunnerError::Timeout(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type RunnerResult<T> = Result<T, RunnerError>;

/// A child that did not finish inside its deadline and had to be signalled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutFailure {
    /// Call site or caller-supplied name of the run
    pub label: String,
    pub timeout: Duration,
    pub pid: u32,
    /// Last signal delivered, e.g. `SIGKILL`
    pub signal_sent: String,
    /// Whether the forceful signal had to follow the terminate signal
    pub escalated: bool,
    /// How the child ended once reaped
    pub status: ExitDisposition,
    /// Output collected before the deadline, unfiltered
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub crash_report: Option<String>,
}

impl TimeoutFailure {
    /// Number of output bytes collected before the child was abandoned
    pub fn collected_bytes(&self) -> usize {
        self.stdout.len() + self.stderr.len()
    }
}

impl fmt::Display for TimeoutFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution of {} expired after {:?}", self.label, self.timeout)?;
        write!(f, "\npid {} {}", self.pid, self.status.describe())?;
        for captured in [&self.stdout, &self.stderr] {
            if !captured.is_empty() {
                write!(f, "\n{}", quote_output(&String::from_utf8_lossy(captured)))?;
            }
        }
        if let Some(log) = &self.crash_report {
            write!(f, "\n{}", quote_output(log))?;
        }
        Ok(())
    }
}
