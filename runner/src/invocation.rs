//! Immutable description of one child run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use shared::config::{DEFAULT_GRACE, DEFAULT_TIMEOUT};

use crate::traits::KillTarget;

/// Pure post-processing applied to captured bytes
pub type StreamFilter = Arc<dyn Fn(Vec<u8>) -> Vec<u8> + Send + Sync>;

/// Which child output streams are captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Nothing captured; the child writes to the parent's streams
    #[default]
    None,
    Stdout,
    Stderr,
    /// Both streams, each into its own buffer
    Both,
    /// Both streams through one pipe into the stdout buffer
    Merged,
}

impl CaptureMode {
    /// Stdout gets a pipe of its own
    pub fn pipes_stdout(&self) -> bool {
        matches!(self, CaptureMode::Stdout | CaptureMode::Both)
    }

    /// Stderr gets a pipe of its own
    pub fn pipes_stderr(&self) -> bool {
        matches!(self, CaptureMode::Stderr | CaptureMode::Both)
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, CaptureMode::Merged)
    }
}

/// Process-group placement of the child
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessGroup {
    /// Stay in the parent's group; only the child itself is signalled
    #[default]
    Inherit,
    /// Lead a new group; the whole group is signalled
    New,
    /// Join an existing group; that group is signalled
    Join(i32),
}

impl ProcessGroup {
    /// Value for `Command::process_group`, if any
    pub fn pgid(&self) -> Option<i32> {
        match self {
            ProcessGroup::Inherit => None,
            ProcessGroup::New => Some(0),
            ProcessGroup::Join(pgid) => Some(*pgid),
        }
    }

    /// Who receives termination signals for a child with this pid
    pub fn kill_target(&self, pid: u32) -> KillTarget {
        let pid = pid as i32;
        match self {
            ProcessGroup::Inherit => KillTarget::Process(pid),
            ProcessGroup::New => KillTarget::Group(pid),
            ProcessGroup::Join(pgid) => KillTarget::Group(*pgid),
        }
    }
}

/// One child run: what to execute, what to feed it, and how long to wait
#[derive(Clone)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    env: BTreeMap<String, Option<String>>,
    input: Vec<u8>,
    capture: CaptureMode,
    timeout: Duration,
    grace: Duration,
    kill_wait: Option<Duration>,
    stdout_filter: Option<StreamFilter>,
    stderr_filter: Option<StreamFilter>,
    process_group: ProcessGroup,
    current_dir: Option<PathBuf>,
    label: String,
}

impl Invocation {
    /// Start describing a run of `program`; the caller's location becomes the label
    #[track_caller]
    pub fn builder(program: impl Into<PathBuf>) -> InvocationBuilder {
        InvocationBuilder::new(program.into(), Location::caller().to_string())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Caller overrides; `None` removes the variable from the child
    pub fn env_overrides(&self) -> &BTreeMap<String, Option<String>> {
        &self.env
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn capture(&self) -> CaptureMode {
        self.capture
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn kill_wait(&self) -> Option<Duration> {
        self.kill_wait
    }

    pub fn process_group(&self) -> ProcessGroup {
        self.process_group
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// File name of the program, used to match crash reports
    pub fn program_basename(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    pub(crate) fn filter_stdout(&self, bytes: Vec<u8>) -> Vec<u8> {
        match &self.stdout_filter {
            Some(filter) => filter(bytes),
            None => bytes,
        }
    }

    pub(crate) fn filter_stderr(&self, bytes: Vec<u8>) -> Vec<u8> {
        match &self.stderr_filter {
            Some(filter) => filter(bytes),
            None => bytes,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &self.env)
            .field("input_len", &self.input.len())
            .field("capture", &self.capture)
            .field("timeout", &self.timeout)
            .field("grace", &self.grace)
            .field("kill_wait", &self.kill_wait)
            .field("stdout_filter", &self.stdout_filter.is_some())
            .field("stderr_filter", &self.stderr_filter.is_some())
            .field("process_group", &self.process_group)
            .field("current_dir", &self.current_dir)
            .field("label", &self.label)
            .finish()
    }
}

/// Fluent builder for [`Invocation`]
pub struct InvocationBuilder {
    invocation: Invocation,
}

impl InvocationBuilder {
    fn new(program: PathBuf, label: String) -> Self {
        Self {
            invocation: Invocation {
                program,
                args: Vec::new(),
                env: BTreeMap::new(),
                input: Vec::new(),
                capture: CaptureMode::None,
                timeout: DEFAULT_TIMEOUT,
                grace: DEFAULT_GRACE,
                kill_wait: None,
                stdout_filter: None,
                stderr_filter: None,
                process_group: ProcessGroup::Inherit,
                current_dir: None,
                label,
            },
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.invocation.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.invocation.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a variable in the child, overriding inherited and locale values
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.invocation.env.insert(key.into(), Some(value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in vars {
            self.invocation.env.insert(key.into(), Some(value.into()));
        }
        self
    }

    /// Remove a variable from the child's environment
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.invocation.env.insert(key.into(), None);
        self
    }

    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.invocation.input = input.into();
        self
    }

    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.invocation.capture = capture;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.invocation.timeout = timeout;
        self
    }

    /// Wait between the terminate signal and the kill signal
    pub fn grace(mut self, grace: Duration) -> Self {
        self.invocation.grace = grace;
        self
    }

    /// Bound the wait after the kill signal; unbounded when never set
    pub fn kill_wait(mut self, kill_wait: Duration) -> Self {
        self.invocation.kill_wait = Some(kill_wait);
        self
    }

    pub fn stdout_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync + 'static,
    {
        self.invocation.stdout_filter = Some(Arc::new(filter));
        self
    }

    pub fn stderr_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync + 'static,
    {
        self.invocation.stderr_filter = Some(Arc::new(filter));
        self
    }

    pub fn process_group(mut self, group: ProcessGroup) -> Self {
        self.invocation.process_group = group;
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.invocation.current_dir = Some(dir.into());
        self
    }

    /// Name reported when the run times out (defaults to the builder's call site)
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.invocation.label = label.into();
        self
    }

    pub fn build(self) -> Invocation {
        self.invocation
    }
}
