//! Fetch orchestration over an [`Endpoint`]
//!
//! [`Fetcher`] exposes the request patterns built on top of a single endpoint:
//!
//! | Operation | Endpoint call | Failure handling |
//! |-----------|---------------|------------------|
//! | [`Fetcher::fetch_resource`] | once, `single_delay` | logged, returns `None` |
//! | [`Fetcher::fetch_sequential`] | once per id, in order | failures omitted |
//! | [`Fetcher::fetch_parallel`] | once per id, all at once | failures omitted |
//! | [`Fetcher::fetch_with_timeout`] | once, raced against a timer | `Timeout` or endpoint error |
//! | [`Fetcher::fetch_with_retry`] | up to `max_attempts` | `RetryExhausted` |
//!
//! Only the single-fetch path swallows errors. Timeout and retry use the raw
//! endpoint call and propagate typed failures.

use crate::config::FetchConfig;
use crate::endpoint::{Endpoint, FetchResult, SimulatedEndpoint};
use crate::error::{FetchError, Result};
use crate::retry::{with_retry, with_retry_state, RetryPolicy, RetryState};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Runs fetch patterns against a shared endpoint.
#[derive(Clone)]
pub struct Fetcher {
    endpoint: Arc<dyn Endpoint>,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(endpoint: Arc<dyn Endpoint>, config: FetchConfig) -> Self {
        Self { endpoint, config }
    }

    /// Simulated endpoint built from `config`.
    pub fn from_config(config: FetchConfig) -> Self {
        let endpoint = Arc::new(SimulatedEndpoint::from_config(&config));
        Self::new(endpoint, config)
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn endpoint(&self) -> Arc<dyn Endpoint> {
        self.endpoint.clone()
    }

    /// Fetch one resource; a failure is reported and becomes `None`.
    pub async fn fetch_resource(&self, identifier: &str) -> Option<FetchResult> {
        debug!(identifier = %identifier, "Fetching");
        match self.endpoint.call(identifier, self.config.single_delay()).await {
            Ok(result) => {
                debug!(identifier = %identifier, "Fetched");
                Some(result)
            }
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "Fetch failed");
                None
            }
        }
    }

    /// Fetch each identifier in turn. Latency is the sum of the calls.
    pub async fn fetch_sequential<S: AsRef<str>>(&self, identifiers: &[S]) -> Vec<FetchResult> {
        let mut results = Vec::with_capacity(identifiers.len());
        for identifier in identifiers {
            if let Some(result) = self.fetch_resource(identifier.as_ref()).await {
                results.push(result);
            }
        }
        results
    }

    /// Start every fetch, then join them all. Latency is the slowest call.
    ///
    /// Successes keep their input order.
    pub async fn fetch_parallel<S: AsRef<str>>(&self, identifiers: &[S]) -> Vec<FetchResult> {
        let fetches = identifiers
            .iter()
            .map(|identifier| self.fetch_resource(identifier.as_ref()));

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Fetch with the configured default deadline.
    pub async fn fetch_with_default_timeout(&self, identifier: &str) -> Result<FetchResult> {
        self.fetch_with_timeout(identifier, self.config.timeout()).await
    }

    /// Race the endpoint against a `timeout` timer.
    ///
    /// The endpoint's latency runs as its own task and is not cancelled. The
    /// task settles the call only while the caller is still waiting: settling
    /// and abandoning both happen under one lock, so once the timer wins the
    /// late call draws nothing, counts nothing and its outcome never exists.
    pub async fn fetch_with_timeout(&self, identifier: &str, timeout: Duration) -> Result<FetchResult> {
        let endpoint = self.endpoint.clone();
        let owned_identifier = identifier.to_string();
        let delay = self.config.timeout_fetch_delay();
        let abandoned = Arc::new(Mutex::new(false));
        let task_abandoned = abandoned.clone();
        let (tx, mut rx) = oneshot::channel();

        tokio::spawn(async move {
            endpoint.wait(&owned_identifier, delay).await;

            let abandoned = task_abandoned.lock();
            if *abandoned {
                debug!(identifier = %owned_identifier, "Late call suppressed after timeout");
                return;
            }
            let _ = tx.send(endpoint.settle(&owned_identifier));
        });

        let outcome = tokio::select! {
            biased;
            settled = &mut rx => settled.map_err(FetchError::from).and_then(|result| result),
            _ = tokio::time::sleep(timeout) => {
                let mut abandoned = abandoned.lock();
                match rx.try_recv() {
                    // Settled in the same instant the timer fired.
                    Ok(result) => result,
                    Err(_) => {
                        *abandoned = true;
                        Err(FetchError::Timeout {
                            identifier: identifier.to_string(),
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    }
                }
            }
        };

        if let Err(e) = &outcome {
            warn!(identifier = %identifier, error = %e, "Fetch with timeout failed");
        }
        outcome
    }

    /// Retry the raw endpoint call up to `max_attempts` times.
    pub async fn fetch_with_retry(&self, identifier: &str, max_attempts: usize) -> Result<FetchResult> {
        let policy = self.retry_policy(max_attempts);
        let delay = self.config.retry_delay();
        let result = with_retry(&policy, identifier, |_| self.endpoint.call(identifier, delay)).await;

        if let Ok(found) = &result {
            info!(identifier = %found.identifier, "Retry successful");
        }
        result
    }

    /// [`Fetcher::fetch_with_retry`] that also reports attempts and backoffs.
    pub async fn fetch_with_retry_state(
        &self,
        identifier: &str,
        max_attempts: usize,
        state: &mut RetryState,
    ) -> Result<FetchResult> {
        let policy = self.retry_policy(max_attempts);
        let delay = self.config.retry_delay();
        with_retry_state(&policy, identifier, state, |_| self.endpoint.call(identifier, delay)).await
    }

    fn retry_policy(&self, max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::from_config(&self.config)
        }
    }
}
