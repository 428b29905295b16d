//! Error types for fetch orchestration and configuration.
//!
//! ```text
//! FetchError
//! ├── Endpoint        - Simulated transient failure for one identifier
//! ├── Timeout         - The timer won the race against the endpoint
//! ├── RetryExhausted  - Every attempt failed; wraps the last failure
//! ├── InvalidRetryPolicy - The policy allows no attempt at all
//! └── JoinFailed      - The spawned endpoint task ended without settling
//!
//! ConfigError
//! ├── Env / Parse     - Environment variable lookup or parsing
//! ├── Io              - Reading a config file
//! ├── Format          - YAML / JSON decoding, unknown extension
//! └── Invalid         - Value rejected by validation
//! ```

use thiserror::Error;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors surfaced by the raw endpoint, timeout and retry paths.
///
/// The single-fetch layer absorbs [`FetchError::Endpoint`]; nothing above it
/// ever sees one.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The endpoint failed for this identifier.
    #[error("{reason}")]
    Endpoint { identifier: String, reason: String },

    /// The endpoint did not settle before the timer fired.
    #[error("Request timeout: {identifier} did not respond within {timeout_ms}ms")]
    Timeout { identifier: String, timeout_ms: u64 },

    /// All attempts failed.
    #[error("Failed after {attempts} attempts: {last}")]
    RetryExhausted {
        identifier: String,
        attempts: usize,
        last: Box<FetchError>,
    },

    /// The retry policy cannot make a single attempt.
    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    /// The spawned endpoint task ended without settling the call.
    #[error("Fetch task failed: {0}")]
    JoinFailed(String),
}

impl FetchError {
    /// Build an endpoint failure with the standard reason text.
    pub fn endpoint(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let reason = format!("Failed to fetch {}", identifier);
        FetchError::Endpoint { identifier, reason }
    }

    /// Identifier the error refers to, if any.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            FetchError::Endpoint { identifier, .. }
            | FetchError::Timeout { identifier, .. }
            | FetchError::RetryExhausted { identifier, .. } => Some(identifier),
            FetchError::InvalidRetryPolicy(_) | FetchError::JoinFailed(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for FetchError {
    fn from(err: tokio::sync::oneshot::error::RecvError) -> Self {
        FetchError::JoinFailed(err.to_string())
    }
}

/// Errors that can occur while loading or validating [`crate::FetchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable missing or unreadable.
    #[error("Environment variable '{key}' not found: {source}")]
    Env {
        key: String,
        #[source]
        source: std::env::VarError,
    },

    /// Environment variable present but not parsable.
    #[error("Failed to parse environment variable '{key}': {message}")]
    Parse { key: String, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed config file or unsupported format.
    #[error("Format error: {0}")]
    Format(String),

    /// Configuration value rejected by validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Format(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Format(err.to_string())
    }
}
