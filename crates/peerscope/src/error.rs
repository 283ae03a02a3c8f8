//! Error types for peer resolution and fundamentals retrieval

use thiserror::Error;

/// Errors raised by peerscope operations
#[derive(Debug, Error)]
pub enum PeerError {
    /// Seed ticker not listed on any configured exchange, or a focal ticker
    /// missing from a comparison table
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream service unavailable or returned data of an unexpected shape
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Ticker exists but carries no data for the requested section
    #[error("No fundamentals for {ticker}: missing {section}")]
    NoFundamentals {
        ticker: String,
        section: String,
    },

    /// Invalid ticker string
    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    /// Rate limit exceeded for the upstream API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded {
        provider: String,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Constituents list could not be read
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// File system error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PeerError {
    /// Whether the error originates from the upstream service
    ///
    /// Transport and decoding failures are reported to callers the same way
    /// as explicit service errors: the whole operation is aborted.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            PeerError::ServiceError(_)
                | PeerError::RateLimitExceeded { .. }
                | PeerError::NetworkError(_)
                | PeerError::JsonError(_)
        )
    }

    /// Collapse transport and decoding failures into [`PeerError::ServiceError`]
    pub fn into_service_error(self) -> Self {
        match self {
            PeerError::ServiceError(_) => self,
            e if e.is_service_error() => PeerError::ServiceError(e.to_string()),
            other => other,
        }
    }

    /// Whether a retry has a chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            PeerError::RateLimitExceeded { .. } => true,
            PeerError::NetworkError(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

/// Result type alias for peerscope operations
pub type Result<T> = std::result::Result<T, PeerError>;
