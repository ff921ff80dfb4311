//! Stdin delivery

use std::io;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;

use shared::process_debug;

use crate::error::{RunnerError, RunnerResult};

/// Write `input` to the child and close its stdin
///
/// A child that exits or closes stdin before reading everything is not an
/// error; the rest of the input is discarded.
pub async fn deliver(stdin: Option<ChildStdin>, input: &[u8], pid: u32) -> RunnerResult<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    if !input.is_empty() {
        match stdin.write_all(input).await {
            Ok(()) => process_debug!(pid, "Wrote {} bytes to stdin", input.len()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                process_debug!(pid, "stdin closed by child, {} bytes discarded", input.len());
            }
            Err(source) => return Err(RunnerError::StdinWrite { source }),
        }
    }

    drop(stdin);
    Ok(())
}
