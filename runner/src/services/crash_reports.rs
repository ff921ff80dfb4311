//! Crash-report recovery
//!
//! On platforms that write per-crash diagnostic files, a child killed by a
//! crash signal leaves a report named after the executable and the crash
//! time. The report may land a little after the child is reaped, so the
//! directory is polled for a while before giving up.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{CrashReportLocator, CrashReportQuery};

/// Signals that leave a crash report behind
pub const CRASH_SIGNALS: [&str; 4] = ["SIGABRT", "SIGQUIT", "SIGSEGV", "SIGILL"];

const STAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";
const STAMP_LEN: usize = 17;
const DEFAULT_ATTEMPTS: u32 = 30;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Locator for platforms without crash reports
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCrashReports;

#[async_trait]
impl CrashReportLocator for NoCrashReports {
    async fn locate(&self, _query: &CrashReportQuery) -> Option<String> {
        None
    }
}

/// Scans a diagnostic-reports directory for `<exe>_<stamp>[-_]*.crash`
#[derive(Debug, Clone)]
pub struct DiagnosticReports {
    dir: PathBuf,
    attempts: u32,
    poll_interval: Duration,
}

impl DiagnosticReports {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            attempts: DEFAULT_ATTEMPTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// `~/Library/Logs/DiagnosticReports` of the current user
    pub fn user_default() -> Option<Self> {
        let home = std::env::var_os("HOME")?;
        Some(Self::new(
            Path::new(&home).join("Library/Logs/DiagnosticReports"),
        ))
    }

    /// Configure how long to wait for a report to appear (fluent API)
    pub fn with_polling(mut self, attempts: u32, poll_interval: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.poll_interval = poll_interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn scan_once(&self, query: &CrashReportQuery) -> Option<String> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !report_name_matches(&name, query) {
                continue;
            }
            let Ok(log) = tokio::fs::read_to_string(entry.path()).await else {
                continue;
            };
            if !header_matches(&log, &query.executable, query.pid) {
                continue;
            }

            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                tracing::debug!("Could not remove crash report {}: {}", name, e);
            }
            let _ = tokio::fs::remove_file(self.dir.join(format!(".{name}.plist"))).await;
            return Some(log);
        }
        None
    }
}

#[async_trait]
impl CrashReportLocator for DiagnosticReports {
    async fn locate(&self, query: &CrashReportQuery) -> Option<String> {
        if !CRASH_SIGNALS.contains(&query.signal.as_str()) {
            return None;
        }
        for attempt in 0..self.attempts {
            if attempt > 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
            if let Some(log) = self.scan_once(query).await {
                tracing::debug!("🩺 Found crash report for pid {} after {} polls", query.pid, attempt + 1);
                return Some(log);
            }
        }
        None
    }
}

/// Locator for this platform, or for `dir` when one is configured
pub fn default_crash_report_locator(dir: Option<PathBuf>) -> Arc<dyn CrashReportLocator> {
    if let Some(dir) = dir {
        return Arc::new(DiagnosticReports::new(dir));
    }
    if cfg!(target_os = "macos") {
        if let Some(reports) = DiagnosticReports::user_default() {
            return Arc::new(reports);
        }
    }
    Arc::new(NoCrashReports)
}

/// `<exe>_<YYYY-MM-DD-HHMMSS>` followed by `-` or `_`, ending in `.crash`,
/// stamped inside the query window (to the second)
fn report_name_matches(name: &str, query: &CrashReportQuery) -> bool {
    let Some(rest) = name
        .strip_prefix(query.executable.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };
    if !rest.ends_with(".crash") {
        return false;
    }
    let (Some(stamp), Some(tail)) = (rest.get(..STAMP_LEN), rest.get(STAMP_LEN..)) else {
        return false;
    };
    if !tail.starts_with(['-', '_']) {
        return false;
    }
    let Ok(naive) = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT) else {
        return false;
    };
    let Some(stamped) = Local.from_local_datetime(&naive).earliest() else {
        return false;
    };
    let at = stamped.timestamp();
    query.since.timestamp() <= at && at <= query.until.timestamp()
}

/// First line reads `Process: <exe> [<pid>]`
fn header_matches(log: &str, executable: &str, pid: u32) -> bool {
    let Some(first) = log.lines().next() else {
        return false;
    };
    let Some(rest) = first.strip_prefix("Process:") else {
        return false;
    };
    rest.starts_with(char::is_whitespace) && rest.trim() == format!("{executable} [{pid}]")
}
