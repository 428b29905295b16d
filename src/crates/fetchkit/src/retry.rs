//! Retry with exponential backoff
//!
//! A [`RetryPolicy`] bounds the number of attempts and sets the backoff base.
//! The shape is fixed: after failed attempt `k` (1-based) the driver waits
//! `backoff_base * 2^(k-1)` before attempt `k + 1`, and it never waits after
//! the final attempt.
//!
//! ```text
//! attempt 1 ── fail ── wait base ──── attempt 2 ── fail ── wait 2·base ── attempt 3
//!                                                                           │
//!                                          success ◄────────────────────────┤
//!                                          RetryExhausted(last error) ◄─────┘
//! ```
//!
//! With the defaults (3 attempts, base 100ms) the waits are 100ms and 200ms.
//!
//! # Example
//!
//! ```rust
//! use fetchkit::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
//! assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
//! assert!(!policy.should_retry(3));
//! ```

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Attempt bound and backoff base for retrying a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: usize,

    /// Wait after the first failed attempt
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy with the given max attempts
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            backoff_base: Duration::from_millis(100),
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.max_attempts).with_backoff_base(config.backoff_base())
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Wait inserted after failed attempt `attempt` (1-based).
    pub fn backoff_after(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = u32::try_from(attempt - 1).unwrap_or(u32::MAX);
        let factor = 2u32.saturating_pow(exponent);
        self.backoff_base.saturating_mul(factor)
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn should_retry(&self, attempts: usize) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Retry state for tracking retry attempts
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Number of attempts made so far
    pub attempts: usize,

    /// Last error message
    pub last_error: Option<String>,

    /// Backoff waits taken, in order
    pub backoffs: Vec<Duration>,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt
    pub fn record_attempt(&mut self, error: Option<String>) {
        self.attempts += 1;
        self.last_error = error;
    }

    pub fn record_backoff(&mut self, delay: Duration) {
        self.backoffs.push(delay);
    }
}

/// Run `operation` under `policy`, returning the first success.
///
/// `operation` receives the 1-based attempt number. When every attempt fails
/// the result is [`FetchError::RetryExhausted`] wrapping the last error. A
/// policy with no attempts is rejected with [`FetchError::InvalidRetryPolicy`]
/// before anything runs.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, identifier: &str, operation: F) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut state = RetryState::new();
    with_retry_state(policy, identifier, &mut state, operation).await
}

/// [`with_retry`] that records attempts and backoffs into `state`.
pub async fn with_retry_state<F, Fut, T>(
    policy: &RetryPolicy,
    identifier: &str,
    state: &mut RetryState,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if policy.max_attempts == 0 {
        return Err(FetchError::InvalidRetryPolicy(
            "max_attempts must be at least 1".to_string(),
        ));
    }

    loop {
        let attempt = state.attempts + 1;
        info!(
            identifier = %identifier,
            attempt = attempt,
            max_attempts = policy.max_attempts,
            "Attempt {}/{}",
            attempt,
            policy.max_attempts
        );

        let e = match operation(attempt).await {
            Ok(value) => {
                state.record_attempt(None);
                if attempt > 1 {
                    debug!(identifier = %identifier, attempt = attempt, "Retry succeeded");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        state.record_attempt(Some(e.to_string()));
        if !policy.should_retry(state.attempts) {
            warn!(
                identifier = %identifier,
                attempt = attempt,
                error = %e,
                "Attempt failed, max attempts exhausted"
            );
            return Err(FetchError::RetryExhausted {
                identifier: identifier.to_string(),
                attempts: state.attempts,
                last: Box::new(e),
            });
        }

        let delay = policy.backoff_after(attempt);
        warn!(
            identifier = %identifier,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "Attempt failed, retrying"
        );
        state.record_backoff(delay);
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_base, Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5).with_backoff_base(Duration::from_millis(50));
        assert_eq!(policy.backoff_after(0), Duration::ZERO);
        assert_eq!(policy.backoff_after(1), Duration::from_millis(50));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(400));
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3);
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_immediately() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new();

        let result = with_retry_state(&policy, "/api/users", &mut state, |_| async {
            Ok::<_, FetchError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(state.attempts, 1);
        assert!(state.backoffs.is_empty());
        assert!(state.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_passes_attempt_numbers() {
        let policy = RetryPolicy::new(4);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let result = with_retry(&policy, "/api/x", move |attempt| {
            let seen = seen_clone.clone();
            async move {
                seen.lock().push(attempt);
                Err::<(), _>(FetchError::endpoint("/api/x"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(*seen.lock(), vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_zero_attempts() {
        let policy = RetryPolicy::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let result = with_retry(&policy, "/api/x", move |_| {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, FetchError>(())
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::InvalidRetryPolicy(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_wraps_real_last_error() {
        let policy = RetryPolicy::new(2);

        let result = with_retry(&policy, "/api/x", |attempt| async move {
            Err::<(), _>(FetchError::Endpoint {
                identifier: "/api/x".to_string(),
                reason: format!("attempt {} refused", attempt),
            })
        })
        .await;

        match result {
            Err(FetchError::RetryExhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last.to_string(), "attempt 2 refused");
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let config = FetchConfig {
            max_attempts: 5,
            backoff_base_ms: 40,
            ..Default::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff_base, Duration::from_millis(40));
    }

    proptest! {
        #[test]
        fn backoff_after_next_attempt_is_double(base_ms in 1u64..1_000, attempt in 1usize..16) {
            let policy = RetryPolicy::new(32).with_backoff_base(Duration::from_millis(base_ms));
            prop_assert_eq!(policy.backoff_after(attempt + 1), policy.backoff_after(attempt) * 2);
        }
    }
}
