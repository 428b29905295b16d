//! Configuration for the endpoint, fetch paths and cache.
//!
//! Values come from three layers, later layers winning:
//! 1. Built-in defaults ([`FetchConfig::default`])
//! 2. A YAML or JSON file ([`FetchConfig::load`])
//! 3. `FETCHKIT_*` environment variables ([`FetchConfig::apply_env`])
//!
//! # Example
//!
//! ```rust,no_run
//! use fetchkit::FetchConfig;
//!
//! let mut config = FetchConfig::load("fetchkit.yaml")?;
//! config.apply_env("FETCHKIT")?;
//! config.validate()?;
//! # Ok::<(), fetchkit::ConfigError>(())
//! ```

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "FETCHKIT";

/// Tunables for every component. Durations are stored in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Probability that a single endpoint call fails.
    pub failure_rate: f64,

    /// Seed for the failure draw; `None` uses the thread RNG.
    pub seed: Option<u64>,

    /// Endpoint latency for single and batch fetches.
    pub single_delay_ms: u64,

    /// Endpoint latency inside the timeout race.
    pub timeout_fetch_delay_ms: u64,

    /// Endpoint latency for each retry attempt.
    pub retry_delay_ms: u64,

    /// Endpoint latency on a cache miss.
    pub cache_delay_ms: u64,

    /// Default deadline for the timeout race.
    pub timeout_ms: u64,

    /// Maximum attempts for retry, including the first.
    pub max_attempts: usize,

    /// Backoff before the second attempt; doubles after each further failure.
    pub backoff_base_ms: u64,

    /// Validity window of a cache entry.
    pub cache_ttl_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.1,
            seed: None,
            single_delay_ms: 500,
            timeout_fetch_delay_ms: 500,
            retry_delay_ms: 300,
            cache_delay_ms: 500,
            timeout_ms: 3000,
            max_attempts: 3,
            backoff_base_ms: 100,
            cache_ttl_ms: 5000,
        }
    }
}

impl FetchConfig {
    /// Load from a file, picking the format from its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_config_file(path)
    }

    /// Defaults overridden by environment variables under `prefix`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(prefix)?;
        Ok(config)
    }

    /// Override fields from `<PREFIX>_<FIELD>` variables that are set.
    pub fn apply_env(&mut self, prefix: &str) -> Result<()> {
        override_from_env(&env_key(prefix, "FAILURE_RATE"), &mut self.failure_rate)?;
        if let Some(seed) = get_env_parse_opt(&env_key(prefix, "SEED"))? {
            self.seed = Some(seed);
        }
        override_from_env(&env_key(prefix, "SINGLE_DELAY_MS"), &mut self.single_delay_ms)?;
        override_from_env(
            &env_key(prefix, "TIMEOUT_FETCH_DELAY_MS"),
            &mut self.timeout_fetch_delay_ms,
        )?;
        override_from_env(&env_key(prefix, "RETRY_DELAY_MS"), &mut self.retry_delay_ms)?;
        override_from_env(&env_key(prefix, "CACHE_DELAY_MS"), &mut self.cache_delay_ms)?;
        override_from_env(&env_key(prefix, "TIMEOUT_MS"), &mut self.timeout_ms)?;
        override_from_env(&env_key(prefix, "MAX_ATTEMPTS"), &mut self.max_attempts)?;
        override_from_env(&env_key(prefix, "BACKOFF_BASE_MS"), &mut self.backoff_base_ms)?;
        override_from_env(&env_key(prefix, "CACHE_TTL_MS"), &mut self.cache_ttl_ms)?;
        Ok(())
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(ConfigError::Invalid(format!(
                "failure_rate must be within [0, 1], got {}",
                self.failure_rate
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::Invalid(
                "cache_ttl_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn single_delay(&self) -> Duration {
        Duration::from_millis(self.single_delay_ms)
    }

    pub fn timeout_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.timeout_fetch_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_delay(&self) -> Duration {
        Duration::from_millis(self.cache_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn env_key(prefix: &str, field: &str) -> String {
    format!("{}_{}", prefix, field)
}

/// Get an environment variable as a string.
pub fn get_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|source| ConfigError::Env {
        key: key.to_string(),
        source,
    })
}

/// Get an environment variable and parse it to the specified type.
pub fn get_env_parse<T: FromStr>(key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let value = get_env(key)?;
    value.trim().parse::<T>().map_err(|e| ConfigError::Parse {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Parse an environment variable if it is set; unset yields `None`.
pub fn get_env_parse_opt<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match get_env_parse(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::Env {
            source: std::env::VarError::NotPresent,
            ..
        }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn override_from_env<T: FromStr>(key: &str, field: &mut T) -> Result<()>
where
    T::Err: std::fmt::Display,
{
    if let Some(value) = get_env_parse_opt(key)? {
        *field = value;
    }
    Ok(())
}

/// Load configuration from a YAML file.
fn load_yaml_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    serde_yaml::from_str(&content).map_err(|e| {
        ConfigError::Format(format!(
            "Failed to parse YAML config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a JSON file.
fn load_json_config<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&content).map_err(|e| {
        ConfigError::Format(format!(
            "Failed to parse JSON config from {:?}: {}",
            path.as_ref(),
            e
        ))
    })
}

/// Load configuration from a file (auto-detect format from extension).
fn load_config_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            ConfigError::Format(format!("Unable to determine file extension for {:?}", path))
        })?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => load_yaml_config(path),
        "json" => load_json_config(path),
        _ => Err(ConfigError::Format(format!(
            "Unsupported config file extension: {}",
            extension
        ))),
    }
}
