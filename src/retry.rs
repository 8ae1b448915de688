//! Bounded retry with fixed pacing and backoff.
//!
//! Every attempt is preceded by a fixed pacing delay (providers rate-limit
//! bursts) and every failed attempt is followed by a fixed backoff. When the
//! attempts run out the caller gets [`StatsError::Unavailable`] instead of
//! the provider error.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::StatsError;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before each attempt
    pub pacing: Duration,
    /// Delay after a failed attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pacing: Duration::from_millis(1200),
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            pacing: Duration::from_millis(config.pacing_ms),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// No pacing or backoff, mainly for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            pacing: Duration::ZERO,
            backoff: Duration::ZERO,
        }
    }
}

/// Retry an async operation on any failure
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T, StatsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(policy, operation_name, operation, |_: &E| true).await
}

/// Retry an async operation while `should_retry` accepts the error
pub async fn retry_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, StatsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    let mut last_error = String::new();

    while attempts < max_attempts {
        if !policy.pacing.is_zero() {
            sleep(policy.pacing).await;
        }
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                last_error = e.to_string();
                if !should_retry(&e) {
                    warn!("{} failed with a non-retriable error: {}", operation_name, e);
                    break;
                }
                if attempts < max_attempts {
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name, attempts, max_attempts, e, policy.backoff
                    );
                    sleep(policy.backoff).await;
                }
            }
        }
    }

    warn!(
        "{} unavailable after {} attempt(s): {}",
        operation_name, attempts, last_error
    );
    Err(StatsError::Unavailable {
        operation: operation_name.to_string(),
        attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let policy = RetryPolicy::immediate(3);
        let result = retry(&policy, "test", || async { Ok::<_, &str>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = retry(&policy, "test", || {
            let c = counter_clone.clone();
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err("temporary failure")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_all_failures_spaced_by_backoff() {
        let policy = RetryPolicy {
            max_attempts: 3,
            pacing: Duration::ZERO,
            backoff: Duration::from_secs(2),
        };

        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();

        let result: Result<i32, _> = retry(&policy, "flaky", || {
            calls_clone.lock().unwrap().push(Instant::now());
            async { Err::<i32, _>("permanent failure") }
        })
        .await;

        match result {
            Err(StatsError::Unavailable {
                operation,
                attempts,
                last_error,
            }) => {
                assert_eq!(operation, "flaky");
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "permanent failure");
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= Duration::from_secs(2), "gap {:?}", gap);
            assert!(gap < Duration::from_millis(2010), "gap {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_before_every_attempt() {
        let policy = RetryPolicy {
            max_attempts: 2,
            pacing: Duration::from_millis(1200),
            backoff: Duration::from_secs(2),
        };
        let start = Instant::now();

        let _ = retry(&policy, "paced", || async { Err::<(), _>("down") }).await;

        // pacing + backoff + pacing, no backoff after the final attempt
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4400), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(4420), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_retry_if_stops_on_non_retriable() {
        let policy = RetryPolicy::immediate(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = retry_if(
            &policy,
            "lookup",
            || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("404 not found") }
            },
            |e: &&str| !e.starts_with("404"),
        )
        .await;

        assert!(matches!(
            result,
            Err(StatsError::Unavailable { attempts: 1, .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::immediate(0);
        let result = retry(&policy, "test", || async { Ok::<_, &str>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from_config(&FetchConfig::default());
        assert_eq!(policy, RetryPolicy::default());
    }
}
