//! Simulated endpoint - the only source of latency and failure
//!
//! Every orchestration path in this crate talks to an [`Endpoint`]. The
//! production implementation, [`SimulatedEndpoint`], sleeps for the requested
//! delay and then either fails (with probability `p`, default 0.1) or returns
//! a [`FetchResult`] stamped by its [`Clock`].
//!
//! # Determinism
//!
//! Two things vary between runs: the failure draw and the delay. The draw is
//! delegated to a [`FailureSource`] and taken when a call settles, never while
//! it waits. Tests use [`ScriptedFailures`] to pin the exact sequence of
//! outcomes. Delays use `tokio::time::sleep`, so tests run
//! under `#[tokio::test(start_paused = true)]` and observe exact virtual time.
//!
//! ```rust
//! use fetchkit::{Endpoint, ScriptedFailures, SimulatedEndpoint};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let endpoint = SimulatedEndpoint::with_failures(ScriptedFailures::new([true, false]));
//!
//! assert!(endpoint.call("/api/users", Duration::ZERO).await.is_err());
//! let result = endpoint.call("/api/users", Duration::ZERO).await.unwrap();
//! assert_eq!(result.payload, "Data from /api/users");
//! assert_eq!(endpoint.call_count(), 2);
//! # }
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Successful response from an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Always equal to the identifier that was requested.
    pub identifier: String,

    pub payload: String,

    pub observed_at: DateTime<Utc>,
}

impl FetchResult {
    pub fn new(identifier: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        let identifier = identifier.into();
        let payload = format!("Data from {}", identifier);
        Self {
            identifier,
            payload,
            observed_at,
        }
    }
}

/// Decides whether a given call fails.
pub trait FailureSource: Send + Sync {
    fn should_fail(&self, identifier: &str) -> bool;
}

/// Bernoulli failure draw backed by `rand`.
pub struct RandomFailure {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl RandomFailure {
    /// Fail with probability `rate`, seeded from OS entropy.
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of draws for a given seed.
    pub fn seeded(rate: f64, seed: u64) -> Self {
        Self {
            rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FailureSource for RandomFailure {
    fn should_fail(&self, _identifier: &str) -> bool {
        self.rng.lock().gen::<f64>() < self.rate
    }
}

/// Replays a fixed list of outcomes (`true` = fail), then falls back.
pub struct ScriptedFailures {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
}

impl ScriptedFailures {
    /// Play `script` in order, then succeed forever.
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: false,
        }
    }

    pub fn never_fail() -> Self {
        Self::new([])
    }

    pub fn always_fail() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: true,
        }
    }
}

impl FailureSource for ScriptedFailures {
    fn should_fail(&self, _identifier: &str) -> bool {
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }
}

/// Fails only for the listed identifiers.
pub struct FailingIdentifiers {
    identifiers: Vec<String>,
}

impl FailingIdentifiers {
    pub fn new<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }
}

impl FailureSource for FailingIdentifiers {
    fn should_fail(&self, identifier: &str) -> bool {
        self.identifiers.iter().any(|id| id == identifier)
    }
}

/// A unit of work that settles after `delay` with a result or an error.
///
/// A call has two phases. [`Endpoint::wait`] is the latency and must not
/// touch shared state. [`Endpoint::settle`] produces the outcome and is the
/// only place an endpoint may consume draws or update counters, so a caller
/// that stops waiting can skip it.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Simulated latency before the call settles.
    async fn wait(&self, _identifier: &str, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    /// Outcome of the call; all side effects happen here.
    fn settle(&self, identifier: &str) -> Result<FetchResult>;

    async fn call(&self, identifier: &str, delay: Duration) -> Result<FetchResult> {
        self.wait(identifier, delay).await;
        self.settle(identifier)
    }
}

/// Process-local stand-in for a remote API.
pub struct SimulatedEndpoint {
    failures: Arc<dyn FailureSource>,
    clock: Arc<dyn Clock>,
    calls: AtomicUsize,
}

impl SimulatedEndpoint {
    /// Random failures at `failure_rate`, system clock.
    pub fn new(failure_rate: f64) -> Self {
        Self::with_failures(RandomFailure::new(failure_rate))
    }

    /// Failure draw configured from `config` (seeded when a seed is set).
    pub fn from_config(config: &FetchConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_failures(RandomFailure::seeded(config.failure_rate, seed)),
            None => Self::new(config.failure_rate),
        }
    }

    pub fn with_failures(failures: impl FailureSource + 'static) -> Self {
        Self {
            failures: Arc::new(failures),
            clock: Arc::new(SystemClock),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Number of calls settled so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for SimulatedEndpoint {
    fn default() -> Self {
        Self::new(FetchConfig::default().failure_rate)
    }
}

#[async_trait]
impl Endpoint for SimulatedEndpoint {
    fn settle(&self, identifier: &str) -> Result<FetchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        trace!(identifier = %identifier, "endpoint settled");

        if self.failures.should_fail(identifier) {
            return Err(FetchError::endpoint(identifier));
        }
        Ok(FetchResult::new(identifier, self.clock.now()))
    }
}
