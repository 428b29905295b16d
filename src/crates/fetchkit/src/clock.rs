//! Wall-clock source for result timestamps.
//!
//! Latency, timeouts and TTL checks run on tokio's monotonic clock so tests
//! can pause and advance it. Only `FetchResult::observed_at` needs calendar
//! time, and it comes from an injected [`Clock`].

use chrono::{DateTime, Utc};

/// Source of the timestamp stamped onto each successful fetch.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
