//! Results of a completed child run

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitDisposition {
    /// Normal exit with a status code
    Exited { code: i32 },
    /// Terminated by a signal
    Signaled { signal: i32, core_dumped: bool },
}

impl ExitDisposition {
    pub fn success(&self) -> bool {
        matches!(self, ExitDisposition::Exited { code: 0 })
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitDisposition::Exited { code } => Some(*code),
            ExitDisposition::Signaled { .. } => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match self {
            ExitDisposition::Signaled { signal, .. } => Some(*signal),
            ExitDisposition::Exited { .. } => None,
        }
    }

    pub fn is_signaled(&self) -> bool {
        self.signal().is_some()
    }

    pub fn core_dumped(&self) -> bool {
        matches!(self, ExitDisposition::Signaled { core_dumped: true, .. })
    }

    /// Symbolic name of the terminating signal, e.g. `SIGSEGV`
    pub fn signal_name(&self) -> Option<String> {
        self.signal().map(signal_name)
    }

    /// Human-readable description, e.g. `killed by SIGSEGV (signal 11) (core dumped)`
    pub fn describe(&self) -> String {
        match self {
            ExitDisposition::Exited { code } => format!("exited with status {code}"),
            ExitDisposition::Signaled { signal, core_dumped } => {
                let mut text = format!("killed by {} (signal {signal})", signal_name(*signal));
                if *core_dumped {
                    text.push_str(" (core dumped)");
                }
                text
            }
        }
    }

    /// Shell-style exit code: the status code, or 128 plus the signal number
    pub fn shell_code(&self) -> i32 {
        match self {
            ExitDisposition::Exited { code } => *code,
            ExitDisposition::Signaled { signal, .. } => 128 + signal,
        }
    }
}

impl From<ExitStatus> for ExitDisposition {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ExitDisposition::Exited { code },
            (None, Some(signal)) => ExitDisposition::Signaled {
                signal,
                core_dumped: status.core_dumped(),
            },
            // Stopped/continued states are never reported by a blocking wait
            (None, None) => ExitDisposition::Exited { code: -1 },
        }
    }
}

/// Symbolic name for a signal number, falling back to `SIG<n>`
pub fn signal_name(signal: i32) -> String {
    match Signal::try_from(signal) {
        Ok(sig) => sig.as_str().to_string(),
        Err(_) => format!("SIG{signal}"),
    }
}

/// Prefix every line with `"| "` so captured text stands out in a failure message
pub fn quote_output(text: &str) -> String {
    text.lines()
        .map(|line| format!("| {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Captured result of a child that finished inside its deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub pid: u32,
    /// Captured standard output (or both streams in merged mode), filtered
    pub stdout: Vec<u8>,
    /// Captured standard error, filtered
    pub stderr: Vec<u8>,
    pub status: ExitDisposition,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stdout split into lines without terminators
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout_lossy().lines().map(str::to_string).collect()
    }

    pub fn stderr_lines(&self) -> Vec<String> {
        self.stderr_lossy().lines().map(str::to_string).collect()
    }
}
