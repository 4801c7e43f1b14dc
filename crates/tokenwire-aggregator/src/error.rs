//! Aggregator boundary errors

use thiserror::Error;
use tokenwire_types::ErrorClass;

/// Errors crossing the aggregator boundary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    /// Connection refused, reset, timed out
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("aggregator returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// JSON-RPC error object
    #[error("aggregator error {code}: {message}")]
    Server { code: i64, message: String },

    /// Body that is not the expected JSON-RPC shape
    #[error("malformed aggregator response: {0}")]
    Protocol(String),

    /// The aggregator refused the commitment itself
    #[error("commitment refused by aggregator: {0}")]
    Rejected(String),

    /// Client-side setup problem (bad URL, unusable API key)
    #[error("aggregator configuration error: {0}")]
    Config(String),
}

impl AggregatorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AggregatorError::Transport(_)
            | AggregatorError::Server { .. }
            | AggregatorError::Protocol(_) => ErrorClass::Transient,
            AggregatorError::Http { status, .. } if *status == 401 || *status == 403 => {
                ErrorClass::Configuration
            }
            AggregatorError::Http { .. } => ErrorClass::Transient,
            AggregatorError::Rejected(_) => ErrorClass::Invalid,
            AggregatorError::Config(_) => ErrorClass::Configuration,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<reqwest::Error> for AggregatorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AggregatorError::Protocol(err.to_string())
        } else if err.is_builder() {
            AggregatorError::Config(err.to_string())
        } else {
            AggregatorError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AggregatorError {
    fn from(err: serde_json::Error) -> Self {
        AggregatorError::Protocol(err.to_string())
    }
}

/// Result type for aggregator calls
pub type AggregatorResult<T> = Result<T, AggregatorError>;
