//! Shared helpers for fetchkit integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fetchkit::{Clock, Endpoint, FetchConfig, FetchError, FetchResult, Fetcher, ScriptedFailures, SimulatedEndpoint};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Sample identifiers used by the demo driver.
pub const SAMPLE_IDS: [&str; 3] = ["/api/users", "/api/posts", "/api/comments"];

/// Simulated endpoint that replays `script` (`true` = fail).
pub fn scripted_endpoint(script: impl IntoIterator<Item = bool>) -> Arc<SimulatedEndpoint> {
    Arc::new(SimulatedEndpoint::with_failures(ScriptedFailures::new(script)))
}

/// Fetcher with default timings over `endpoint`.
pub fn fetcher_over(endpoint: Arc<dyn Endpoint>) -> Fetcher {
    Fetcher::new(endpoint, FetchConfig::default())
}

/// Endpoint with a per-identifier delay override that records every call
/// it starts and every call it settles.
pub struct RecordingEndpoint {
    delays: HashMap<String, Duration>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
}

impl RecordingEndpoint {
    pub fn new() -> Self {
        Self {
            delays: HashMap::new(),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, identifier: &str, delay: Duration) -> Self {
        self.delays.insert(identifier.to_string(), delay);
        self
    }

    pub fn failing(mut self, identifier: &str) -> Self {
        self.failing.push(identifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Identifiers whose call settled (success or failure).
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl Endpoint for RecordingEndpoint {
    async fn wait(&self, identifier: &str, delay: Duration) {
        self.calls.lock().push(identifier.to_string());
        let delay = self.delays.get(identifier).copied().unwrap_or(delay);
        tokio::time::sleep(delay).await;
    }

    fn settle(&self, identifier: &str) -> fetchkit::Result<FetchResult> {
        self.completed.lock().push(identifier.to_string());

        if self.failing.iter().any(|id| id == identifier) {
            Err(FetchError::endpoint(identifier))
        } else {
            Ok(FetchResult::new(identifier, chrono::Utc::now()))
        }
    }
}

/// Clock that moves forward one second every time it is read.
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock();
        let now = *next;
        *next = now + chrono::Duration::seconds(1);
        now
    }
}
