//! Failure descriptions for children that died abnormally

use runner::{ExitDisposition, quote_output};

/// Message for a child that ended with `status`
///
/// Layout: the caller's message, then `pid N killed by SIGX (signal n)`, then
/// the child's output and any crash log, each line prefixed with `| `.
pub fn describe_failure(
    pid: u32,
    status: &ExitDisposition,
    message: Option<&str>,
    output: &str,
    crash_log: Option<&str>,
) -> String {
    let mut full = String::new();
    if let Some(message) = message.filter(|m| !m.is_empty()) {
        full.push_str(message);
        full.push('\n');
    }
    full.push_str(&format!("pid {pid} {}", status.describe()));
    if !output.is_empty() {
        full.push('\n');
        full.push_str(&quote_output(output));
        full.push('\n');
    }
    if let Some(log) = crash_log {
        full.push('\n');
        full.push_str(&quote_output(log));
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_with_core_and_output() {
        let status = ExitDisposition::Signaled {
            signal: 11,
            core_dumped: true,
        };
        let text = describe_failure(77, &status, Some("segfault test"), "before crash\n", None);
        assert_eq!(
            text,
            "segfault test\npid 77 killed by SIGSEGV (signal 11) (core dumped)\n| before crash\n"
        );
    }

    #[test]
    fn test_crash_log_is_quoted() {
        let status = ExitDisposition::Signaled {
            signal: 6,
            core_dumped: false,
        };
        let text = describe_failure(5, &status, None, "", Some("Process: ruby [5]\nCrashed Thread: 0"));
        assert_eq!(
            text,
            "pid 5 killed by SIGABRT (signal 6)\n| Process: ruby [5]\n| Crashed Thread: 0"
        );
    }

    #[test]
    fn test_empty_message_is_skipped() {
        let text = describe_failure(1, &ExitDisposition::Exited { code: 2 }, Some(""), "", None);
        assert_eq!(text, "pid 1 exited with status 2");
    }
}
