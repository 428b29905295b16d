//! TTL cache in front of an endpoint
//!
//! [`ApiCache`] memoizes [`FetchResult`]s by identifier for a fixed window.
//! Each identifier moves through three logical states:
//!
//! ```text
//!            get (miss)              ttl elapses             get (miss)
//!  Absent ─────────────► Valid ─────────────────► Expired ─────────────► Valid
//!                          ▲ │                                (entry replaced)
//!                          └─┘ get (hit, no endpoint call)
//! ```
//!
//! Expiry is evaluated on read; nothing runs in the background. An expired
//! entry stays in the map (and counts toward [`ApiCache::size`]) until the
//! next `get` for its identifier replaces it.
//!
//! # Concurrency
//!
//! The lock is released while the endpoint call is in flight. Two concurrent
//! misses for the same identifier therefore both call the endpoint, and the
//! one that finishes last owns the stored entry. This duplicate fetch is
//! tolerated.
//!
//! # Example
//!
//! ```rust
//! use fetchkit::{ApiCache, ScriptedFailures, SimulatedEndpoint};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fetchkit::Result<()> {
//! let endpoint = Arc::new(SimulatedEndpoint::with_failures(ScriptedFailures::never_fail()));
//! let cache = ApiCache::new(endpoint.clone(), Duration::from_secs(3))
//!     .with_fetch_delay(Duration::ZERO);
//!
//! let first = cache.get("/api/cached").await?;
//! let second = cache.get("/api/cached").await?;
//!
//! assert_eq!(first, second);
//! assert_eq!(endpoint.call_count(), 1);
//! assert_eq!(cache.size().await, 1);
//! # Ok(())
//! # }
//! ```

use crate::config::FetchConfig;
use crate::endpoint::{Endpoint, FetchResult};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Cached value and the moment it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: FetchResult,

    pub inserted_at: Instant,
}

impl CacheEntry {
    pub fn new(value: FetchResult) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    /// Valid while strictly less than `ttl` has elapsed.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Lookup counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,

    pub misses: usize,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Read-through cache with a fixed time-to-live.
pub struct ApiCache {
    endpoint: Arc<dyn Endpoint>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: RwLock<CacheStats>,
    ttl: Duration,
    fetch_delay: Duration,
}

impl ApiCache {
    /// Cache over `endpoint`; misses use a 500ms simulated latency.
    pub fn new(endpoint: Arc<dyn Endpoint>, ttl: Duration) -> Self {
        Self {
            endpoint,
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            ttl,
            fetch_delay: FetchConfig::default().cache_delay(),
        }
    }

    pub fn from_config(endpoint: Arc<dyn Endpoint>, config: &FetchConfig) -> Self {
        Self::new(endpoint, config.cache_ttl()).with_fetch_delay(config.cache_delay())
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the fresh cached value, or fetch and store a new one.
    ///
    /// Endpoint errors propagate and leave the map untouched.
    pub async fn get(&self, identifier: &str) -> Result<FetchResult> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(identifier) {
                if entry.is_fresh(self.ttl) {
                    debug!(identifier = %identifier, "Cache hit");
                    self.stats.write().await.hits += 1;
                    return Ok(entry.value.clone());
                }
            }
        }

        debug!(identifier = %identifier, "Cache miss, fetching");
        self.stats.write().await.misses += 1;

        let value = self.endpoint.call(identifier, self.fetch_delay).await?;

        self.entries
            .write()
            .await
            .insert(identifier.to_string(), CacheEntry::new(value.clone()));

        Ok(value)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included.
    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn stats(&self) -> CacheStats {
        *self.stats.read().await
    }
}
