//! Output collectors
//!
//! One background task per captured stream drains the pipe into a buffer
//! shared only with the supervisor. A collector that is abandoned at the
//! deadline still leaves whatever it read so far in that buffer.

use serde::Serialize;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;

use crate::error::{RunnerError, RunnerResult};
use crate::services::launcher::OutputPipe;

const CHUNK_SIZE: usize = 8 * 1024;

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Which child stream a collector drains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
    /// Stdout and stderr sharing one pipe
    Merged,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
            StreamKind::Merged => write!(f, "merged output"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStatus {
    /// Reached end-of-stream
    Finished,
    /// Cancelled before end-of-stream
    Abandoned,
}

/// Bytes a collector gathered and whether it reached end-of-stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorResult {
    pub stream: StreamKind,
    pub bytes: Vec<u8>,
    pub status: CollectorStatus,
}

/// Background task draining one pipe
pub struct Collector {
    stream: StreamKind,
    buffer: SharedBuffer,
    handle: Option<JoinHandle<io::Result<()>>>,
    finished: bool,
}

impl Collector {
    pub fn spawn(stream: StreamKind, pipe: OutputPipe) -> Self {
        let buffer = SharedBuffer::default();
        let handle = tokio::spawn(drain(pipe, Arc::clone(&buffer)));
        Self {
            stream,
            buffer,
            handle: Some(handle),
            finished: false,
        }
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }

    /// Wait for end-of-stream
    ///
    /// Cancel-safe: if this future is dropped the task keeps its handle and
    /// can still be aborted and joined.
    pub async fn join(&mut self) -> RunnerResult<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };
        let joined = handle.await;
        self.handle = None;
        match joined {
            Ok(Ok(())) => {
                self.finished = true;
                Ok(())
            }
            Ok(Err(source)) => Err(RunnerError::StreamRead {
                stream: self.stream,
                source,
            }),
            Err(join_error) => Err(RunnerError::StreamRead {
                stream: self.stream,
                source: io::Error::other(join_error.to_string()),
            }),
        }
    }

    /// Cancel the task and wait until it has actually stopped
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn into_result(self) -> CollectorResult {
        let bytes = std::mem::take(&mut *lock(&self.buffer));
        CollectorResult {
            stream: self.stream,
            bytes,
            status: if self.finished {
                CollectorStatus::Finished
            } else {
                CollectorStatus::Abandoned
            },
        }
    }
}

/// Captured streams sorted into their buffers
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Stdout, or both streams in merged mode
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Collectors for every captured stream of one child
#[derive(Default)]
pub struct CollectorSet {
    collectors: Vec<Collector>,
}

impl CollectorSet {
    pub fn spawn(pipes: Vec<(StreamKind, OutputPipe)>) -> Self {
        Self {
            collectors: pipes
                .into_iter()
                .map(|(stream, pipe)| Collector::spawn(stream, pipe))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Wait for every collector to reach end-of-stream
    pub async fn join_all(&mut self) -> RunnerResult<()> {
        for collector in &mut self.collectors {
            collector.join().await?;
        }
        Ok(())
    }

    /// Cancel and join whatever is still running
    pub async fn shutdown(&mut self) {
        for collector in &mut self.collectors {
            collector.shutdown().await;
        }
    }

    pub fn into_results(self) -> Vec<CollectorResult> {
        self.collectors.into_iter().map(Collector::into_result).collect()
    }

    pub fn into_output(self) -> CapturedOutput {
        let mut output = CapturedOutput::default();
        for result in self.into_results() {
            match result.stream {
                StreamKind::Stdout | StreamKind::Merged => output.stdout = result.bytes,
                StreamKind::Stderr => output.stderr = result.bytes,
            }
        }
        output
    }
}

async fn drain(mut pipe: OutputPipe, buffer: SharedBuffer) -> io::Result<()> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => return Ok(()),
            Ok(n) => lock(&buffer).extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn lock(buffer: &SharedBuffer) -> std::sync::MutexGuard<'_, Vec<u8>> {
    // A panicking reader cannot leave the byte buffer half-written
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
