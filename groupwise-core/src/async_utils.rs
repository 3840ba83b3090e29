//! Async utilities
//!
//! Deadline handling for calls that cross the backend boundary

use crate::error::{ErrorContext, GroupwiseError, GroupwiseResult};
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Timeout wrapper for async operations
pub async fn with_timeout<F, T>(
    future: F,
    timeout_ms: u64,
    operation_name: &str,
) -> GroupwiseResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms = timeout_ms,
                "Operation timed out"
            );
            Err(GroupwiseError::Timeout {
                operation: operation_name.to_string(),
                duration_ms: timeout_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation("timeout")
                    .with_metadata("timeout_ms", &timeout_ms.to_string())
                    .with_suggestion("Increase apply.timeout_ms")
                    .with_suggestion("Verify the daemon is reachable"),
            })
        }
    }
}

/// Run a fallible backend call under a deadline, flattening the two error layers
pub async fn with_deadline<F, T>(
    future: F,
    timeout_ms: u64,
    operation_name: &str,
) -> GroupwiseResult<T>
where
    F: std::future::Future<Output = GroupwiseResult<T>>,
{
    with_timeout(future, timeout_ms, operation_name).await?
}
