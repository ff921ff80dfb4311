//! Service-specific tests
//!
//! Each service has its own test file. These spawn real `/bin/sh` children
//! and touch real temporary directories.

mod crash_reports;

pub mod common {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Upper bound for anything a test child should finish within
    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Run async operations with a timeout
    pub async fn with_timeout<T, F>(future: F) -> Result<T, tokio::time::error::Elapsed>
    where
        F: std::future::Future<Output = T>,
    {
        timeout(TEST_TIMEOUT, future).await
    }
}
