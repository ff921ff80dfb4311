//! DiagnosticReports against a temporary reports directory

use chrono::{Duration as ChronoDuration, Local};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use crate::services::crash_reports::{DiagnosticReports, default_crash_report_locator};
use crate::traits::{CrashReportLocator, CrashReportQuery};

fn query(signal: &str, pid: u32) -> CrashReportQuery {
    let now = Local::now();
    CrashReportQuery {
        signal: signal.to_string(),
        executable: "ruby".to_string(),
        pid,
        since: now - ChronoDuration::seconds(5),
        until: now + ChronoDuration::seconds(5),
    }
}

/// Write a report and its plist sidecar, returning the report name
fn write_report(dir: &Path, pid: u32) -> String {
    let name = format!("ruby_{}_testhost.crash", Local::now().format("%Y-%m-%d-%H%M%S"));
    let body = format!("Process:               ruby [{pid}]\nPath:                  /usr/bin/ruby\n");
    std::fs::write(dir.join(&name), body).unwrap();
    std::fs::write(dir.join(format!(".{name}.plist")), "<plist/>").unwrap();
    name
}

fn fast(dir: &Path) -> DiagnosticReports {
    DiagnosticReports::new(dir).with_polling(2, Duration::from_millis(10))
}

#[tokio::test]
async fn test_matching_report_is_returned_and_removed() {
    let dir = TempDir::new().unwrap();
    let name = write_report(dir.path(), 4242);

    let log = fast(dir.path()).locate(&query("SIGSEGV", 4242)).await;

    let log = log.expect("report should be found");
    assert!(log.starts_with("Process:               ruby [4242]"));
    assert!(!dir.path().join(&name).exists());
    assert!(!dir.path().join(format!(".{name}.plist")).exists());
}

#[tokio::test]
async fn test_other_pid_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let name = write_report(dir.path(), 1111);

    assert_eq!(fast(dir.path()).locate(&query("SIGSEGV", 4242)).await, None);
    assert!(dir.path().join(&name).exists());
}

#[tokio::test]
async fn test_non_crash_signal_skips_lookup() {
    let dir = TempDir::new().unwrap();
    let name = write_report(dir.path(), 4242);

    assert_eq!(fast(dir.path()).locate(&query("SIGKILL", 4242)).await, None);
    assert!(dir.path().join(&name).exists());
}

#[tokio::test]
async fn test_report_written_late_is_picked_up_by_polling() {
    let dir = TempDir::new().unwrap();
    let reports = DiagnosticReports::new(dir.path()).with_polling(30, Duration::from_millis(50));
    let path = dir.path().to_path_buf();

    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        write_report(&path, 7);
    });

    let log = reports.locate(&query("SIGABRT", 7)).await;
    writer.await.unwrap();
    assert!(log.is_some());
}

#[tokio::test]
async fn test_missing_directory_finds_nothing() {
    let reports = fast(Path::new("/nonexistent/diagnostic-reports"));
    assert_eq!(reports.locate(&query("SIGILL", 1)).await, None);
}

#[tokio::test]
async fn test_configured_directory_wins() {
    let dir = TempDir::new().unwrap();
    write_report(dir.path(), 99);

    let locator = default_crash_report_locator(Some(dir.path().to_path_buf()));
    assert!(locator.locate(&query("SIGQUIT", 99)).await.is_some());
}
