//! Deadline wrapper for fallible async calls
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Bound a fallible future by `duration`.
///
/// An elapsed deadline is converted into the caller's error type, so the
/// result keeps a single error channel.
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError(duration).into()),
    }
}
