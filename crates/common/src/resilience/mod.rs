//! Bounded retry with exponential backoff for upstream HTTP calls
//!
//! Collaborator clients classify each failure as transient or permanent;
//! transient failures are retried at most `max_retries` times.

use crate::errors::{AppError, Result};
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Failure of a single attempt
pub type AttemptError = backoff::Error<AppError>;

/// Backoff policy shared by the collaborator clients
pub fn backoff_policy() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(100))
        .with_max_interval(Duration::from_secs(2))
        .with_max_elapsed_time(Some(Duration::from_secs(30)))
        .build()
}

/// Whether an HTTP status is worth retrying
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Run `op` until it succeeds, fails permanently, or exhausts `max_retries`
pub async fn with_retry<T, F, Fut>(service: &str, max_retries: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut attempt = 0u32;

    retry(backoff_policy(), || {
        attempt += 1;
        let current = attempt;
        let fut = op();

        async move {
            match fut.await {
                Err(backoff::Error::Transient { err, .. }) if current > max_retries => {
                    Err(backoff::Error::permanent(err))
                }
                Err(backoff::Error::Transient { err, retry_after }) => {
                    warn!(
                        service,
                        attempt = current,
                        max_retries,
                        error = %err,
                        "Upstream request failed, retrying"
                    );
                    Err(backoff::Error::Transient { err, retry_after })
                }
                other => other,
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn upstream(message: &str) -> AppError {
        AppError::LanguageModel {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);

        let value = with_retry("test", 3, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(backoff::Error::transient(upstream("busy")))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_retries() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retry("test", 1, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(backoff::Error::transient(upstream("busy")))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retry("test", 5, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(backoff::Error::permanent(upstream("bad request")))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retryable_status() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }
}
