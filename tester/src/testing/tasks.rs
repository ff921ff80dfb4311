//! Joining a batch of spawned tasks

use tokio::task::{JoinError, JoinHandle};

use super::assertions::AssertionResult;

/// Await every handle; all values in order, or one failure naming every bad task
///
/// Every handle is awaited even after a failure so no task is left detached.
pub async fn assert_join_tasks<T>(handles: Vec<JoinHandle<T>>, message: Option<&str>) -> Result<Vec<T>, AssertionResult> {
    let mut values = Vec::with_capacity(handles.len());
    let mut errors = Vec::new();

    for (index, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(value) => values.push(value),
            Err(e) => errors.push(format!("task {index}:\n{}", describe_join_error(e))),
        }
    }

    if errors.is_empty() {
        return Ok(values);
    }

    tracing::warn!("❌ {} of {} tasks failed", errors.len(), values.len() + errors.len());
    let mut text = format!("exceptions on {} tasks:\n{}", errors.len(), errors.join("\n---\n"));
    if let Some(message) = message {
        text = format!("{message}\n{text}");
    }
    Err(AssertionResult::failure(text, None))
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_cancelled() {
        return "cancelled".to_string();
    }
    match error.try_into_panic() {
        Ok(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            format!("panicked: {reason}")
        }
        Err(error) => error.to_string(),
    }
}
