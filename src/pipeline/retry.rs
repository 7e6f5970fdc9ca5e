//! Exponential-backoff retry for model calls.
//!
//! [`with_retry`] wraps any fallible async operation. Every error is treated
//! as transient: the wait starts at `initial_wait` and is multiplied by
//! `exponential_base` after each failure, with no jitter and no ceiling. With
//! the default policy (5 retries, 1 s, ×2) the waits are 1 → 2 → 4 → 8 → 16 s.

use crate::config::RetryPolicy;
use std::error::Error;
use std::fmt;
use std::future::Future;
use tokio::time::sleep;
use tracing::warn;

/// Terminal error: the operation failed on every allowed attempt.
#[derive(Debug)]
pub struct RetriesExhausted<E> {
    /// Attempts made (`max_retries + 1`).
    pub attempts: u32,
    /// Error returned by the final attempt.
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetriesExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "maximum retries reached after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: Error + 'static> Error for RetriesExhausted<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.last_error)
    }
}

/// Run `operation` until it succeeds or `policy.max_retries` retries have
/// failed.
///
/// `label` names the call site in retry notices.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetriesExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut retries: u32 = 0;
    let mut wait = policy.initial_wait;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                retries += 1;
                if retries > policy.max_retries {
                    return Err(RetriesExhausted {
                        attempts: retries,
                        last_error: e,
                    });
                }
                warn!(
                    "{}: retry {}/{} in {:?} after error: {}",
                    label, retries, policy.max_retries, wait, e
                );
                sleep(wait).await;
                wait = policy.next_wait(wait);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    #[derive(Debug)]
    struct Boom(u32);

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom #{}", self.0)
        }
    }

    impl Error for Boom {}

    #[tokio::test(start_paused = true)]
    async fn first_success_returns_immediately() {
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();
        let out = with_retry(&RetryPolicy::default(), "test", || {
            calls.set(calls.get() + 1);
            async { Ok::<_, Boom>("done") }
        })
        .await
        .unwrap();
        assert_eq!(out, "done");
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_fails_after_one_attempt() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(0, Duration::from_secs(1), 2.0);
        let err = with_retry(&policy, "test", || {
            let n = calls.get() + 1;
            calls.set(n);
            async move { Err::<(), _>(Boom(n)) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_error_wraps_the_last_failure() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(2, Duration::from_millis(10), 2.0);
        let err = with_retry(&policy, "test", || {
            let n = calls.get() + 1;
            calls.set(n);
            async move { Err::<(), _>(Boom(n)) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.last_error.0, 3);
        let msg = err.to_string();
        assert!(msg.contains("maximum retries reached"), "got: {msg}");
        assert!(msg.contains("boom #3"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_next_wait_does_not_panic() {
        // 1 s × 1e20 does not fit in a Duration; the second wait saturates.
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(3, Duration::from_secs(1), 1e20);
        let start = tokio::time::Instant::now();
        let out = with_retry(&policy, "test", || {
            let n = calls.get() + 1;
            calls.set(n);
            async move {
                if n < 2 {
                    Err(Boom(n))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(out, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_base_still_exhausts_cleanly() {
        let calls = Cell::new(0u32);
        let policy = RetryPolicy::new(1, Duration::from_secs(1), 1e20);
        let err = with_retry(&policy, "test", || {
            let n = calls.get() + 1;
            calls.set(n);
            async move { Err::<(), _>(Boom(n)) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 2);
        assert_eq!(calls.get(), 2);
    }
}
