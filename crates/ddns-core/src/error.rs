//! Error types for the DDNS update system
//!
//! Errors never cross the `execute` boundary of an updater: they are used by
//! the configuration layer and by the protocol primitives, and the updater
//! folds them into an [`UpdateOutcome`](crate::UpdateOutcome).

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS update system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing or malformed action arguments)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (record data, names, operation)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// TSIG key or signature errors
    #[error("TSIG error: {0}")]
    Tsig(String),

    /// DNS wire encoding/decoding errors
    #[error("DNS encoding error: {0}")]
    Encoding(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a TSIG error
    pub fn tsig(msg: impl Into<String>) -> Self {
        Self::Tsig(msg.into())
    }

    /// Create an encoding error
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
