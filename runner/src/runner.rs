//! Main runner implementation
//!
//! The runner supervises one child per call: it feeds stdin, collects the
//! captured streams and enforces the deadline. A child that outlives its
//! deadline is signalled, escalated if it ignores the polite request, reaped,
//! and reported as a [`TimeoutFailure`] carrying whatever output it produced.

use chrono::Local;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::time::{Instant, timeout, timeout_at};

use shared::{HarnessConfig, logging, process_debug, process_info, process_warn};

use crate::core::{Phase, SignalPolicy};
use crate::error::{RunnerError, RunnerResult, TimeoutFailure};
use crate::invocation::Invocation;
use crate::outcome::{ExecutionOutcome, ExitDisposition};
use crate::services::collector::CollectorSet;
use crate::services::crash_reports::default_crash_report_locator;
use crate::services::launcher::{self, ChildHandle};
use crate::services::signals::NixSignalSender;
use crate::services::writer;
use crate::traits::{CrashReportLocator, CrashReportQuery, DeliveryError, SignalSender, TermSignal};

/// Runner wired to the operating system
pub type SystemRunner = Runner<NixSignalSender, Arc<dyn CrashReportLocator>>;

/// How supervision ended, before output is assembled
enum Verdict {
    Completed(ExitStatus),
    TimedOut {
        status: ExitStatus,
        signal_sent: TermSignal,
        escalated: bool,
    },
}

/// Bounded child-process supervisor
pub struct Runner<S, L>
where
    S: SignalSender + 'static,
    L: CrashReportLocator + 'static,
{
    /// Injected services
    signals: S,
    crash_reports: L,

    policy: SignalPolicy,
}

impl SystemRunner {
    /// Runner using real signals and this platform's crash-report location
    pub fn system() -> Self {
        Runner::new(NixSignalSender::new(), default_crash_report_locator(None))
    }

    /// Like [`Runner::system`], honouring a configured crash-report directory
    pub fn from_config(config: &HarnessConfig) -> Self {
        Runner::new(
            NixSignalSender::new(),
            default_crash_report_locator(config.crash_reports_dir.clone()),
        )
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::system()
    }
}

impl<S, L> Runner<S, L>
where
    S: SignalSender + 'static,
    L: CrashReportLocator + 'static,
{
    /// Create new runner with injected dependencies
    pub fn new(signals: S, crash_reports: L) -> Self {
        Self {
            signals,
            crash_reports,
            policy: SignalPolicy::default(),
        }
    }

    /// Override the termination signal policy (fluent API)
    pub fn with_policy(mut self, policy: SignalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Termination signal policy in effect
    pub fn policy(&self) -> SignalPolicy {
        self.policy
    }

    /// Run `invocation` to completion or until its deadline
    ///
    /// Returns the captured outcome when the child finishes in time, whatever
    /// its exit status. A child still running at the deadline is terminated
    /// and reported as [`RunnerError::Timeout`].
    pub async fn execute(&self, invocation: &Invocation) -> RunnerResult<ExecutionOutcome> {
        let started = Instant::now();
        let started_at = Local::now();
        // A timeout too large for the clock means no deadline at all
        let deadline = started.checked_add(invocation.timeout());

        let mut child = launcher::launch(invocation)?;
        let pid = child.pid();
        let mut collectors = CollectorSet::spawn(child.take_outputs());

        let verdict = self.supervise(invocation, &mut child, &mut collectors, deadline).await;

        // Cleanup runs on every path and never replaces the verdict
        child.close_pipes();
        collectors.shutdown().await;
        child.kill_and_reap(&self.signals, invocation.grace()).await;

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(e) => {
                logging::log_error(pid, invocation.label(), &e);
                return Err(e);
            }
        };

        match verdict {
            Verdict::Completed(status) => {
                let output = collectors.into_output();
                let outcome = ExecutionOutcome {
                    pid,
                    stdout: invocation.filter_stdout(output.stdout),
                    stderr: invocation.filter_stderr(output.stderr),
                    status: ExitDisposition::from(status),
                    elapsed: started.elapsed(),
                };
                process_debug!(
                    pid,
                    "✅ {} in {:?} ({} bytes out, {} bytes err)",
                    outcome.status.describe(),
                    outcome.elapsed,
                    outcome.stdout.len(),
                    outcome.stderr.len()
                );
                Ok(outcome)
            }
            Verdict::TimedOut {
                status,
                signal_sent,
                escalated,
            } => {
                let status = ExitDisposition::from(status);
                let crash_report = match status.signal_name() {
                    Some(signal) => {
                        let query = CrashReportQuery {
                            signal,
                            executable: invocation.program_basename(),
                            pid,
                            since: started_at,
                            until: Local::now(),
                        };
                        self.crash_reports.locate(&query).await
                    }
                    None => None,
                };

                let output = collectors.into_output();
                let failure = TimeoutFailure {
                    label: invocation.label().to_string(),
                    timeout: invocation.timeout(),
                    pid,
                    signal_sent: signal_sent.to_string(),
                    escalated,
                    status,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    crash_report,
                };
                process_warn!(
                    pid,
                    "⏰ {} expired after {:?}, {} ({} bytes collected)",
                    failure.label,
                    failure.timeout,
                    failure.status.describe(),
                    failure.collected_bytes()
                );
                Err(RunnerError::Timeout(Box::new(failure)))
            }
        }
    }

    /// Feed stdin and wait for collectors and the child, all inside the deadline
    async fn supervise(
        &self,
        invocation: &Invocation,
        child: &mut ChildHandle,
        collectors: &mut CollectorSet,
        deadline: Option<Instant>,
    ) -> RunnerResult<Verdict> {
        let pid = child.pid();
        let mut phase = Phase::Running;

        let run = async {
            writer::deliver(child.take_stdin(), invocation.input(), pid).await?;
            collectors.join_all().await?;
            let status = child.wait().await.map_err(|source| RunnerError::Wait { pid, source })?;
            Ok::<_, RunnerError>(status)
        };

        let finished = match deadline {
            Some(deadline) => timeout_at(deadline, run).await,
            None => Ok(run.await),
        };

        match finished {
            Ok(Ok(status)) => {
                advance(pid, &mut phase, Phase::Completed);
                Ok(Verdict::Completed(status))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                advance(pid, &mut phase, Phase::TimedOut);
                self.terminate(invocation, child, &mut phase).await
            }
        }
    }

    /// Signal, wait, escalate; returns once the child has been reaped
    async fn terminate(
        &self,
        invocation: &Invocation,
        child: &mut ChildHandle,
        phase: &mut Phase,
    ) -> RunnerResult<Verdict> {
        let pid = child.pid();
        let target = invocation.process_group().kill_target(pid);
        let mut signal = self.policy.terminate;
        let mut escalated = false;

        loop {
            advance(pid, phase, Phase::Terminating(signal));
            match self.signals.send(target, signal) {
                Ok(()) => process_info!(pid, "🛑 Sent {} to {}", signal, target),
                // Already gone; the wait below reaps it
                Err(DeliveryError::NoSuchProcess) => {
                    process_debug!(pid, "{} exited before {} was sent", target, signal)
                }
                Err(DeliveryError::Failed(reason)) => {
                    return Err(RunnerError::Signal {
                        signal: signal.to_string(),
                        target: target.to_string(),
                        reason,
                    });
                }
            }

            let is_final = self.policy.is_final(signal);
            let limit = if is_final {
                invocation.kill_wait()
            } else {
                Some(invocation.grace())
            };

            let waited = match limit {
                Some(limit) => timeout(limit, child.wait()).await.ok(),
                None => Some(child.wait().await),
            };

            match waited {
                Some(Ok(status)) => {
                    advance(pid, phase, Phase::Reaped);
                    advance(pid, phase, Phase::Failed);
                    return Ok(Verdict::TimedOut {
                        status,
                        signal_sent: signal,
                        escalated,
                    });
                }
                Some(Err(source)) if is_final => {
                    return Err(RunnerError::Escalation {
                        pid,
                        signal: signal.to_string(),
                        source,
                    });
                }
                Some(Err(source)) => return Err(RunnerError::Wait { pid, source }),
                None if is_final => {
                    return Err(RunnerError::Escalation {
                        pid,
                        signal: signal.to_string(),
                        source: io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("still running {:?} after the signal", limit.unwrap_or_default()),
                        ),
                    });
                }
                None => {
                    process_warn!(
                        pid,
                        "🔨 {} ignored {} for {:?}, escalating to {}",
                        target,
                        signal,
                        invocation.grace(),
                        self.policy.escalate
                    );
                    advance(pid, phase, Phase::Escalated);
                    signal = self.policy.escalate;
                    escalated = true;
                }
            }
        }
    }
}

fn advance(pid: u32, phase: &mut Phase, next: Phase) {
    debug_assert!(phase.can_transition_to(next), "illegal transition {phase} -> {next}");
    process_debug!(pid, "{} -> {}", phase, next);
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::CaptureMode;
    use crate::traits::{KillTarget, MockCrashReportLocator, MockSignalSender};
    use std::time::Duration;

    fn no_crash_reports() -> MockCrashReportLocator {
        let mut locator = MockCrashReportLocator::new();
        locator.expect_locate().returning(|_| None);
        locator
    }

    fn sh(script: &str) -> crate::invocation::InvocationBuilder {
        Invocation::builder("/bin/sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_fast_child_is_never_signalled() {
        let mut signals = MockSignalSender::new();
        signals.expect_send().times(0);
        let runner = Runner::new(signals, MockCrashReportLocator::new());

        let invocation = sh("echo done").capture(CaptureMode::Stdout).build();
        let outcome = runner.execute(&invocation).await.unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout, b"done\n");
    }

    #[tokio::test]
    async fn test_unrepresentable_deadline_runs_without_one() {
        let mut signals = MockSignalSender::new();
        signals.expect_send().times(0);
        let runner = Runner::new(signals, MockCrashReportLocator::new());

        let invocation = sh("echo ok").capture(CaptureMode::Stdout).timeout(Duration::MAX).build();
        let outcome = runner.execute(&invocation).await.unwrap();

        assert_eq!(outcome.status, ExitDisposition::Exited { code: 0 });
        assert_eq!(outcome.stdout, b"ok\n");
    }

    #[tokio::test]
    async fn test_vanished_child_is_reaped_without_escalation() {
        // The terminate signal finds nothing; the child then exits on its own
        let mut signals = MockSignalSender::new();
        signals
            .expect_send()
            .withf(|_, signal| *signal == TermSignal::Terminate)
            .times(1)
            .returning(|_, _| Err(DeliveryError::NoSuchProcess));
        let runner = Runner::new(signals, no_crash_reports());

        let invocation = sh("sleep 1")
            .timeout(Duration::from_millis(200))
            .grace(Duration::from_secs(5))
            .build();
        let err = runner.execute(&invocation).await.unwrap_err();

        let failure = err.as_timeout().expect("timeout failure");
        assert_eq!(failure.status, ExitDisposition::Exited { code: 0 });
        assert_eq!(failure.signal_sent, "SIGTERM");
        assert!(!failure.escalated);
    }

    #[tokio::test]
    async fn test_ignored_terminate_escalates_to_kill() {
        let mut signals = MockSignalSender::new();
        let mut seq = mockall::Sequence::new();
        signals
            .expect_send()
            .withf(|_, signal| *signal == TermSignal::Terminate)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        signals
            .expect_send()
            .withf(|_, signal| *signal == TermSignal::Kill)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|target, signal| NixSignalSender::new().send(target, signal));
        let runner = Runner::new(signals, no_crash_reports());

        let invocation = sh("exec sleep 30")
            .timeout(Duration::from_millis(200))
            .grace(Duration::from_millis(200))
            .build();
        let err = runner.execute(&invocation).await.unwrap_err();

        let failure = err.as_timeout().expect("timeout failure");
        assert!(failure.escalated);
        assert_eq!(failure.signal_sent, "SIGKILL");
        assert_eq!(failure.status.signal(), Some(9));
    }

    #[tokio::test]
    async fn test_bounded_kill_wait_expires_as_escalation_error() {
        // Nothing is actually delivered, so the child outlives the kill wait
        let mut signals = MockSignalSender::new();
        signals.expect_send().returning(|_, _| Ok(()));
        let runner = Runner::new(signals, no_crash_reports());

        let invocation = sh("exec sleep 30")
            .timeout(Duration::from_millis(100))
            .grace(Duration::from_millis(100))
            .kill_wait(Duration::from_millis(100))
            .build();
        let err = runner.execute(&invocation).await.unwrap_err();

        assert!(matches!(err, RunnerError::Escalation { ref signal, .. } if signal == "SIGKILL"));
    }

    #[tokio::test]
    async fn test_signal_failure_is_reported() {
        let mut signals = MockSignalSender::new();
        signals
            .expect_send()
            .returning(|_, _| Err(DeliveryError::Failed("operation not permitted".to_string())));
        let runner = Runner::new(signals, no_crash_reports());

        let invocation = sh("exec sleep 30").timeout(Duration::from_millis(100)).build();
        let err = runner.execute(&invocation).await.unwrap_err();

        assert!(matches!(err, RunnerError::Signal { .. }));
        assert!(err.to_string().contains("operation not permitted"));
    }

    #[tokio::test]
    async fn test_group_mode_signals_the_group() {
        let mut signals = MockSignalSender::new();
        signals
            .expect_send()
            .withf(|target, _| matches!(target, KillTarget::Group(_)))
            .returning(|target, signal| NixSignalSender::new().send(target, signal));
        let runner = Runner::new(signals, no_crash_reports());

        let invocation = sh("sleep 30 & wait")
            .process_group(crate::invocation::ProcessGroup::New)
            .timeout(Duration::from_millis(200))
            .build();
        let err = runner.execute(&invocation).await.unwrap_err();
        assert!(err.as_timeout().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_after_error_kills_the_whole_group() {
        let mut signals = MockSignalSender::new();
        signals
            .expect_send()
            .withf(|_, signal| *signal == TermSignal::Terminate)
            .times(1)
            .returning(|_, _| Err(DeliveryError::Failed("operation not permitted".to_string())));
        signals
            .expect_send()
            .withf(|target, signal| matches!(target, KillTarget::Group(_)) && *signal == TermSignal::Kill)
            .times(1)
            .returning(|target, signal| NixSignalSender::new().send(target, signal));
        let runner = Runner::new(signals, no_crash_reports());

        let invocation = sh("sleep 30 & wait")
            .process_group(crate::invocation::ProcessGroup::New)
            .timeout(Duration::from_millis(100))
            .grace(Duration::from_secs(5))
            .build();
        let started = std::time::Instant::now();
        let err = runner.execute(&invocation).await.unwrap_err();

        assert!(matches!(err, RunnerError::Signal { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_crash_signal_queries_locator() {
        let mut signals = MockSignalSender::new();
        signals
            .expect_send()
            .returning(|target, _| NixSignalSender::new().send(target, TermSignal::Terminate));
        let mut locator = MockCrashReportLocator::new();
        locator
            .expect_locate()
            .withf(|query| query.signal == "SIGABRT" && query.executable == "sh" && query.since <= query.until)
            .times(1)
            .returning(|_| Some("Process: sh [1]".to_string()));
        let runner = Runner::new(signals, locator);

        // The shell aborts itself on TERM, so the child dies by a crash signal
        let invocation = sh("trap 'kill -ABRT $$' TERM; while :; do sleep 0.05; done")
            .timeout(Duration::from_millis(200))
            .grace(Duration::from_secs(5))
            .build();
        let err = runner.execute(&invocation).await.unwrap_err();

        let failure = err.as_timeout().expect("timeout failure");
        assert_eq!(failure.status.signal_name().as_deref(), Some("SIGABRT"));
        assert_eq!(failure.crash_report.as_deref(), Some("Process: sh [1]"));
        assert!(failure.to_string().ends_with("| Process: sh [1]"));
    }
}
