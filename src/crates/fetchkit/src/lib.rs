//! # fetchkit
//!
//! Request orchestration over a simulated asynchronous endpoint: single and
//! batch fetches, timeouts, retry with exponential backoff and a TTL cache.
//!
//! # Modules
//!
//! - [`endpoint`] - [`Endpoint`] trait, [`SimulatedEndpoint`], failure sources
//! - [`fetch`] - [`Fetcher`]: single, sequential, parallel, timeout, retry
//! - [`retry`] - [`RetryPolicy`], [`RetryState`] and the generic retry driver
//! - [`cache`] - [`ApiCache`], a read-through TTL cache
//! - [`config`] - [`FetchConfig`] with file and environment loading
//! - [`clock`] - injectable wall clock for result timestamps
//! - [`error`] - [`FetchError`] and [`ConfigError`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fetchkit::{FetchConfig, Fetcher};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let fetcher = Fetcher::from_config(FetchConfig::default());
//!
//! let results = fetcher
//!     .fetch_parallel(&["/api/users", "/api/posts", "/api/comments"])
//!     .await;
//! println!("Fetched {} resources", results.len());
//!
//! match fetcher.fetch_with_retry("/api/unreliable", 3).await {
//!     Ok(result) => println!("Retry successful: {}", result.identifier),
//!     Err(e) => println!("All retries failed: {}", e),
//! }
//! # }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod retry;

pub use cache::{ApiCache, CacheEntry, CacheStats};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FetchConfig;
pub use endpoint::{
    Endpoint, FailingIdentifiers, FailureSource, FetchResult, RandomFailure, ScriptedFailures,
    SimulatedEndpoint,
};
pub use error::{ConfigError, FetchError, Result};
pub use fetch::Fetcher;
pub use retry::{RetryPolicy, RetryState};
