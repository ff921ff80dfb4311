//! Child process launch
//!
//! Wires the child's standard streams to fresh pipes according to the
//! capture mode, pins the locale, applies caller overrides and spawns. The
//! parent never keeps the child's ends of the pipes.

use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::unix::pipe;
use tokio::process::{Child, ChildStdin, Command};

use shared::{logging, process_debug, process_warn};

use crate::core::child_environment;
use crate::error::{RunnerError, RunnerResult};
use crate::invocation::{CaptureMode, Invocation, ProcessGroup};
use crate::services::collector::StreamKind;
use crate::traits::{DeliveryError, KillTarget, SignalSender, TermSignal};

/// Parent's read end of a captured stream
pub type OutputPipe = Box<dyn AsyncRead + Send + Unpin>;

/// Live child plus the parent's ends of its pipes
pub struct ChildHandle {
    child: Child,
    pid: u32,
    group: ProcessGroup,
    stdin: Option<ChildStdin>,
    outputs: Vec<(StreamKind, OutputPipe)>,
    reaped: bool,
}

impl ChildHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn process_group(&self) -> ProcessGroup {
        self.group
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Hand the captured output pipes to their collectors
    pub fn take_outputs(&mut self) -> Vec<(StreamKind, OutputPipe)> {
        std::mem::take(&mut self.outputs)
    }

    pub fn is_reaped(&self) -> bool {
        self.reaped
    }

    /// Block until the child exits and reap it
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.reaped = true;
        Ok(status)
    }

    /// Drop every parent-side pipe end still held here
    pub fn close_pipes(&mut self) {
        self.stdin = None;
        self.outputs.clear();
    }

    /// Forcefully stop a child that is still unreaped, waiting at most `limit`
    ///
    /// A child in its own group is killed together with the rest of the group.
    pub async fn kill_and_reap<S>(&mut self, signals: &S, limit: Duration)
    where
        S: SignalSender + ?Sized,
    {
        if self.reaped {
            return;
        }
        let delivered = match self.group.kill_target(self.pid) {
            KillTarget::Process(_) => false,
            target => match signals.send(target, TermSignal::Kill) {
                Ok(()) | Err(DeliveryError::NoSuchProcess) => true,
                Err(DeliveryError::Failed(reason)) => {
                    process_debug!(self.pid, "kill of {} during cleanup failed: {}", target, reason);
                    false
                }
            },
        };
        if !delivered {
            if let Err(e) = self.child.start_kill() {
                process_debug!(self.pid, "kill during cleanup failed: {}", e);
            }
        }
        match tokio::time::timeout(limit, self.wait()).await {
            Ok(Ok(_)) => process_debug!(self.pid, "Reaped during cleanup"),
            Ok(Err(e)) => process_warn!(self.pid, "⚠️ Failed to reap during cleanup: {}", e),
            Err(_) => process_warn!(self.pid, "⚠️ Not reaped within {:?}, leaving to the runtime", limit),
        }
    }
}

/// Spawn the child described by `invocation`
pub fn launch(invocation: &Invocation) -> RunnerResult<ChildHandle> {
    let program = invocation.program().display().to_string();

    let mut std_command = std::process::Command::new(invocation.program());
    std_command.args(invocation.args()).stdin(Stdio::piped());

    for (key, value) in child_environment(invocation.env_overrides()) {
        match value {
            Some(value) => std_command.env(key, value),
            None => std_command.env_remove(key),
        };
    }

    if let Some(dir) = invocation.current_dir() {
        std_command.current_dir(dir);
    }

    if let Some(pgid) = invocation.process_group().pgid() {
        std_command.process_group(pgid);
    }

    let mut outputs: Vec<(StreamKind, OutputPipe)> = Vec::new();
    match invocation.capture() {
        CaptureMode::Merged => {
            let (reader, writer) = io::pipe().map_err(|source| RunnerError::Pipe { source })?;
            let err_writer = writer.try_clone().map_err(|source| RunnerError::Pipe { source })?;
            std_command.stdout(Stdio::from(writer)).stderr(Stdio::from(err_writer));
            outputs.push((StreamKind::Merged, merged_receiver(reader)?));
        }
        mode => {
            std_command.stdout(stdio_for(mode.pipes_stdout()));
            std_command.stderr(stdio_for(mode.pipes_stderr()));
        }
    }

    let mut command = Command::from(std_command);
    command.kill_on_drop(true);

    let spawned = command.spawn();
    // The command still owns the child's ends of any pipes it was given
    drop(command);

    let mut child = spawned.map_err(|source| RunnerError::Spawn {
        program: program.clone(),
        source,
    })?;
    let pid = child.id().unwrap_or_default();

    let stdin = child.stdin.take();
    if let Some(stdout) = child.stdout.take() {
        outputs.push((StreamKind::Stdout, Box::new(stdout)));
    }
    if let Some(stderr) = child.stderr.take() {
        outputs.push((StreamKind::Stderr, Box::new(stderr)));
    }

    logging::log_spawned(pid, &program);
    process_debug!(
        pid,
        "capture={:?} group={:?} timeout={:?} grace={:?}",
        invocation.capture(),
        invocation.process_group(),
        invocation.timeout(),
        invocation.grace()
    );

    Ok(ChildHandle {
        child,
        pid,
        group: invocation.process_group(),
        stdin,
        outputs,
        reaped: false,
    })
}

fn stdio_for(captured: bool) -> Stdio {
    if captured { Stdio::piped() } else { Stdio::inherit() }
}

/// Async reader over the shared stdout/stderr pipe
fn merged_receiver(reader: io::PipeReader) -> RunnerResult<OutputPipe> {
    let file = std::fs::File::from(OwnedFd::from(reader));
    let receiver = pipe::Receiver::from_file(file).map_err(|source| RunnerError::Pipe { source })?;
    Ok(Box::new(receiver))
}
