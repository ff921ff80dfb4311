//! Assertion context
//!
//! Everything the assertion helpers need is threaded through an explicit
//! [`AssertContext`] instead of process-wide flags. Temporary changes are made
//! through [`AssertContext::scoped`], whose guard restores the previous value
//! however the scope is left.

use std::ffi::OsString;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use runner::services::default_crash_report_locator;
use runner::{CaptureMode, CrashReportLocator, Invocation, InvocationBuilder, SystemRunner};
use shared::config::{DEFAULT_GRACE, DEFAULT_TIMEOUT};
use shared::{HarnessConfig, Verbosity};

use crate::interpreter::Interpreter;

/// Shared settings for a group of assertions
pub struct AssertContext {
    interpreter: Interpreter,
    verbosity: Verbosity,
    timeout: Duration,
    grace: Duration,
    kill_wait: Option<Duration>,
    runner: SystemRunner,
    crash_reports: Arc<dyn CrashReportLocator>,
}

impl AssertContext {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            verbosity: Verbosity::Default,
            timeout: DEFAULT_TIMEOUT,
            grace: DEFAULT_GRACE,
            kill_wait: None,
            runner: SystemRunner::system(),
            crash_reports: default_crash_report_locator(None),
        }
    }

    /// Context for `interpreter_name`, honouring the harness configuration
    pub fn from_config(config: &HarnessConfig, interpreter_name: &str) -> Self {
        let interpreter = Interpreter::resolve(interpreter_name, config.interpreter.as_deref());
        Self {
            interpreter,
            verbosity: config.verbosity,
            timeout: config.timeout,
            grace: config.grace,
            kill_wait: config.kill_wait,
            runner: SystemRunner::from_config(config),
            crash_reports: default_crash_report_locator(config.crash_reports_dir.clone()),
        }
    }

    /// Set the per-run deadline (fluent API)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the terminate-to-kill grace period (fluent API)
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Set the verbosity (fluent API)
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Replace the crash-report locator used for signalled children (fluent API)
    pub fn with_crash_reports(mut self, locator: Arc<dyn CrashReportLocator>) -> Self {
        self.crash_reports = locator;
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn runner(&self) -> &SystemRunner {
        &self.runner
    }

    pub fn crash_reports(&self) -> &dyn CrashReportLocator {
        self.crash_reports.as_ref()
    }

    /// Use `verbosity` until the returned guard is dropped
    pub fn scoped(&mut self, verbosity: Verbosity) -> ScopedContext<'_> {
        let previous = std::mem::replace(&mut self.verbosity, verbosity);
        ScopedContext { ctx: self, previous }
    }

    /// Interpreter run with this context's deadline and the given verbosity
    #[track_caller]
    pub fn invocation<I, S>(&self, verbosity: Verbosity, args: I, stdin: &str, capture: CaptureMode) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.invocation_builder(verbosity, args, stdin, capture).build()
    }

    /// Like [`AssertContext::invocation`], left open for further settings
    #[track_caller]
    pub fn invocation_builder<I, S>(
        &self,
        verbosity: Verbosity,
        args: I,
        stdin: &str,
        capture: CaptureMode,
    ) -> InvocationBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut builder = Invocation::builder(self.interpreter.path())
            .args(self.interpreter.flags_for(verbosity).iter().cloned())
            .args(args)
            .input(stdin)
            .capture(capture)
            .timeout(self.timeout)
            .grace(self.grace);
        if let Some(kill_wait) = self.kill_wait {
            builder = builder.kill_wait(kill_wait);
        }
        builder
    }
}

/// Guard returned by [`AssertContext::scoped`]
pub struct ScopedContext<'a> {
    ctx: &'a mut AssertContext,
    previous: Verbosity,
}

impl Deref for ScopedContext<'_> {
    type Target = AssertContext;

    fn deref(&self) -> &AssertContext {
        self.ctx
    }
}

impl DerefMut for ScopedContext<'_> {
    fn deref_mut(&mut self) -> &mut AssertContext {
        self.ctx
    }
}

impl Drop for ScopedContext<'_> {
    fn drop(&mut self) {
        self.ctx.verbosity = self.previous;
    }
}
