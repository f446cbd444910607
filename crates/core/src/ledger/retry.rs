//! Bounded re-run of a unit of work that lost a race with another writer.

use std::future::Future;

use tracing::warn;

use super::error::LedgerError;

/// Attempts per operation, the first one included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Runs `attempt` until it succeeds, fails for a non-retryable reason, or
/// [`MAX_ATTEMPTS`] is reached. Each attempt must open its own scope.
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &'static str,
    mut attempt: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(e) if e.is_retryable() && tries < MAX_ATTEMPTS => {
                warn!(operation, attempt = tries, error = %e, "Unit of work conflicted, retrying");
                tries += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_conflicts_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry("test", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LedgerError::ConcurrentModification)
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::ConcurrentModification)
        })
        .await;
        assert!(matches!(result, Err(LedgerError::ConcurrentModification)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = with_retry("test", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::NoteTooLong)
        })
        .await;
        assert!(matches!(result, Err(LedgerError::NoteTooLong)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
