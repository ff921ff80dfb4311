//! Main entry point for the runner binary
//!
//! Runs one command under a deadline and mirrors its result: the child's exit
//! code, 128 plus the signal number when it was killed, 124 when it timed out
//! and 127 when it could not be started.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use runner::{
    CaptureMode, ExecutionOutcome, ExitDisposition, Invocation, ProcessGroup, RunnerError, SystemRunner,
    TimeoutFailure,
};
use shared::config::parse_seconds;
use shared::{HarnessConfig, SharedError, logging};

const TIMEOUT_EXIT: i32 = 124;
const SPAWN_FAILURE_EXIT: i32 = 127;

/// Run a command under a wall-clock budget
#[derive(Parser)]
#[command(name = "runner")]
#[command(about = "Runs a command with a timeout, escalating from terminate to kill")]
pub struct Args {
    /// Wall-clock budget in seconds (default from HARNESS_TIMEOUT_SECS, else 10)
    #[arg(long, value_parser = seconds)]
    pub timeout: Option<Duration>,

    /// Seconds between the terminate and kill signals
    #[arg(long, value_parser = seconds)]
    pub grace: Option<Duration>,

    /// Bound on the wait after the kill signal (unbounded when unset)
    #[arg(long, value_parser = seconds)]
    pub kill_wait: Option<Duration>,

    /// Which output streams to capture
    #[arg(long, value_enum, default_value = "both")]
    pub capture: CaptureArg,

    /// Process group: inherit, new, or a numeric group id to join
    #[arg(long, value_parser = process_group, default_value = "inherit")]
    pub pgroup: ProcessGroup,

    /// Set a variable in the child (KEY=VALUE, repeatable)
    #[arg(long = "env", value_parser = env_pair)]
    pub env: Vec<(String, String)>,

    /// Remove a variable from the child (repeatable)
    #[arg(long = "unset")]
    pub unset: Vec<String>,

    /// Text written to the child's stdin
    #[arg(long, conflicts_with = "input_file")]
    pub input: Option<String>,

    /// File whose contents are written to the child's stdin
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Print a JSON report instead of replaying output
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Program and its arguments
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptureArg {
    None,
    Stdout,
    Stderr,
    Both,
    Merged,
}

impl From<CaptureArg> for CaptureMode {
    fn from(arg: CaptureArg) -> Self {
        match arg {
            CaptureArg::None => CaptureMode::None,
            CaptureArg::Stdout => CaptureMode::Stdout,
            CaptureArg::Stderr => CaptureMode::Stderr,
            CaptureArg::Both => CaptureMode::Both,
            CaptureArg::Merged => CaptureMode::Merged,
        }
    }
}

/// Machine-readable result for `--json`
#[derive(Debug, Serialize)]
struct Report<'a> {
    pid: u32,
    timed_out: bool,
    status: ExitDisposition,
    description: String,
    stdout: String,
    stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal_sent: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    escalated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crash_report: Option<&'a str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = HarnessConfig::from_env().context("Invalid harness configuration")?;

    logging::init_tracing(Some(args.log_level.as_deref().unwrap_or(&config.log_level)));

    let invocation = build_invocation(&args, &config)?;
    let runner = SystemRunner::from_config(&config);

    let code = match runner.execute(&invocation).await {
        Ok(outcome) => report_outcome(&args, &outcome)?,
        Err(RunnerError::Timeout(failure)) => report_timeout(&args, &failure)?,
        Err(e @ RunnerError::Spawn { .. }) => {
            eprintln!("runner: {e}");
            SPAWN_FAILURE_EXIT
        }
        Err(e) => return Err(e.into()),
    };

    std::process::exit(code);
}

fn build_invocation(args: &Args, config: &HarnessConfig) -> anyhow::Result<Invocation> {
    let (program, program_args) = args
        .command
        .split_first()
        .context("No program given after --")?;

    let mut builder = Invocation::builder(program)
        .args(program_args)
        .envs(args.env.iter().cloned())
        .capture(args.capture.into())
        .timeout(args.timeout.unwrap_or(config.timeout))
        .grace(args.grace.unwrap_or(config.grace))
        .process_group(args.pgroup)
        .label(args.command.join(" "));

    for key in &args.unset {
        builder = builder.env_remove(key);
    }
    if let Some(kill_wait) = args.kill_wait.or(config.kill_wait) {
        builder = builder.kill_wait(kill_wait);
    }
    if let Some(input) = &args.input {
        builder = builder.input(input.as_bytes());
    }
    if let Some(path) = &args.input_file {
        let input = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        builder = builder.input(input);
    }

    Ok(builder.build())
}

fn report_outcome(args: &Args, outcome: &ExecutionOutcome) -> anyhow::Result<i32> {
    if args.json {
        print_json(&Report {
            pid: outcome.pid,
            timed_out: false,
            status: outcome.status,
            description: outcome.status.describe(),
            stdout: outcome.stdout_lossy(),
            stderr: outcome.stderr_lossy(),
            elapsed_ms: Some(outcome.elapsed.as_millis()),
            signal_sent: None,
            escalated: None,
            crash_report: None,
        })?;
    } else {
        std::io::stdout().write_all(&outcome.stdout)?;
        std::io::stderr().write_all(&outcome.stderr)?;
    }
    Ok(outcome.status.shell_code())
}

fn report_timeout(args: &Args, failure: &TimeoutFailure) -> anyhow::Result<i32> {
    if args.json {
        print_json(&Report {
            pid: failure.pid,
            timed_out: true,
            status: failure.status,
            description: failure.status.describe(),
            stdout: String::from_utf8_lossy(&failure.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&failure.stderr).into_owned(),
            elapsed_ms: None,
            signal_sent: Some(&failure.signal_sent),
            escalated: Some(failure.escalated),
            crash_report: failure.crash_report.as_deref(),
        })?;
    } else {
        eprintln!("{failure}");
    }
    Ok(TIMEOUT_EXIT)
}

fn print_json(report: &Report<'_>) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, report)?;
    writeln!(stdout)?;
    Ok(())
}

fn seconds(value: &str) -> Result<Duration, SharedError> {
    parse_seconds("seconds", value)
}

fn process_group(value: &str) -> Result<ProcessGroup, String> {
    match value {
        "inherit" => Ok(ProcessGroup::Inherit),
        "new" => Ok(ProcessGroup::New),
        pgid => pgid
            .parse::<i32>()
            .ok()
            .filter(|pgid| *pgid > 0)
            .map(ProcessGroup::Join)
            .ok_or_else(|| format!("expected inherit, new or a positive group id, got {pgid:?}")),
    }
}

fn env_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {value:?}")),
    }
}
