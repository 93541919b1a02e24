//! Result-Relay: a resilient examination result retriever
//!
//! This crate fetches a student's examination result from an education-board
//! website, normalizes the unstructured response into a [`ResultRecord`], and
//! shields callers from the upstream site's instability through retries,
//! fallback sources, a time-bounded cache, and a health monitor.

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod monitor;
pub mod query;
pub mod record;

use thiserror::Error;

/// Main error type for Result-Relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport-level failure: timeout, connection refused, DNS
    #[error("Network error: {message}")]
    Network { url: String, message: String },

    /// The upstream returned an explicit error indicator
    #[error("{0}")]
    Upstream(String),

    /// The document was unrecognizable or declared that no result exists
    #[error("{0}")]
    Parse(String),

    /// Every strategy and fallback source was exhausted
    #[error("{message}")]
    Retrieval {
        message: String,
        #[source]
        last: Option<Box<RelayError>>,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// The four failure kinds a retrieval can surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Upstream,
    Parse,
    Retrieval,
}

impl RelayError {
    /// Classifies this error into the retrieval failure taxonomy
    ///
    /// Configuration, query and client-construction errors never come out of a
    /// retrieval attempt, so they return `None`.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Network { .. } => Some(FailureKind::Network),
            Self::Upstream(_) => Some(FailureKind::Upstream),
            Self::Parse(_) => Some(FailureKind::Parse),
            Self::Retrieval { .. } => Some(FailureKind::Retrieval),
            Self::Config(_) | Self::InvalidQuery(_) | Self::Client(_) => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Query construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown education board: {0}")]
    UnknownBoard(String),

    #[error("Unknown examination: {0}")]
    UnknownExam(String),

    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must contain digits only, got '{value}'")]
    NotDigits { field: &'static str, value: String },
}

/// Result type alias for Result-Relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::ResultCache;
pub use config::Config;
pub use fetcher::ResultFetcher;
pub use monitor::{HealthStatus, Monitor};
pub use query::{Board, Exam, ResultQuery};
pub use record::{ResultRecord, Subject};
