//! Test helpers for runner integration tests

use std::time::{Duration, Instant};

use runner::{ExecutionOutcome, Invocation, InvocationBuilder, RunnerError, RunnerResult, SystemRunner, TimeoutFailure};

use super::fixtures::TestFixtures;

pub struct TestHelpers;

impl TestHelpers {
    /// `/bin/sh -c <script>` with test-friendly defaults
    #[track_caller]
    pub fn sh(script: &str) -> InvocationBuilder {
        Invocation::builder(TestFixtures::SHELL).arg("-c").arg(script)
    }

    /// Execute with the system runner and measure wall-clock time
    pub async fn run_timed(invocation: &Invocation) -> (RunnerResult<ExecutionOutcome>, Duration) {
        let started = Instant::now();
        let result = SystemRunner::system().execute(invocation).await;
        (result, started.elapsed())
    }

    /// Unwrap a timeout failure, panicking with the actual result otherwise
    pub fn expect_timeout(result: RunnerResult<ExecutionOutcome>) -> TimeoutFailure {
        match result {
            Err(RunnerError::Timeout(failure)) => *failure,
            other => panic!("expected a timeout failure, got {other:?}"),
        }
    }
}

/// Shorthands for the timing knobs tests set over and over
pub trait InvocationBuilderExt {
    fn quick_deadline(self) -> Self;
}

impl InvocationBuilderExt for InvocationBuilder {
    fn quick_deadline(self) -> Self {
        self.timeout(TestFixtures::SHORT_TIMEOUT).grace(TestFixtures::SHORT_GRACE)
    }
}
