//! Integration tests for retry with exponential backoff

mod common;

use common::{fetcher_over, scripted_endpoint};
use fetchkit::{FetchError, RetryState};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_retry_eventually_succeeds() {
    let endpoint = scripted_endpoint([true, true, false]);
    let fetcher = fetcher_over(endpoint.clone());

    let mut state = RetryState::new();
    let start = Instant::now();
    let result = fetcher
        .fetch_with_retry_state("/api/unreliable", 3, &mut state)
        .await;

    let found = result.unwrap();
    assert_eq!(found.identifier, "/api/unreliable");
    assert_eq!(state.attempts, 3);
    assert_eq!(
        state.backoffs,
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert_eq!(endpoint.call_count(), 3);

    // 3 calls x 300ms latency + 100ms + 200ms backoff
    assert_eq!(start.elapsed(), Duration::from_millis(1200));
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhausts_attempts() {
    let endpoint = scripted_endpoint([true, true, true, true, true]);
    let fetcher = fetcher_over(endpoint.clone());

    let mut state = RetryState::new();
    let start = Instant::now();
    let result = fetcher
        .fetch_with_retry_state("/api/unreliable", 3, &mut state)
        .await;

    match result {
        Err(FetchError::RetryExhausted {
            identifier,
            attempts,
            last,
        }) => {
            assert_eq!(identifier, "/api/unreliable");
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "Failed to fetch /api/unreliable");
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }

    // Never a 4th attempt, and no wait after the last one
    assert_eq!(endpoint.call_count(), 3);
    assert_eq!(state.backoffs.len(), 2);
    assert_eq!(start.elapsed(), Duration::from_millis(1200));
}

#[tokio::test(start_paused = true)]
async fn test_retry_immediate_success() {
    let endpoint = scripted_endpoint([]);
    let fetcher = fetcher_over(endpoint.clone());

    let start = Instant::now();
    let result = fetcher.fetch_with_retry("/api/unreliable", 3).await;

    assert!(result.is_ok());
    assert_eq!(endpoint.call_count(), 1);
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhausted_message() {
    let endpoint = scripted_endpoint([true, true]);
    let fetcher = fetcher_over(endpoint);

    let err = fetcher.fetch_with_retry("/api/flaky", 2).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed after 2 attempts: Failed to fetch /api/flaky"
    );
}
