//! CLI error types and exit codes

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;
use tokenwire_aggregator::AggregatorError;
use tokenwire_commitment::CommitmentError;
use tokenwire_crypto::KeyError;
use tokenwire_transfer::{EnvelopeError, PipelineError, TokenStateError};
use tokenwire_types::ErrorClass;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{path}: {message}")]
    File { path: PathBuf, message: String },

    #[error("invalid key: {0}")]
    Key(#[from] KeyError),

    #[error(transparent)]
    Commitment(#[from] CommitmentError),

    #[error(transparent)]
    Aggregator(#[from] AggregatorError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Token(#[from] TokenStateError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl CliError {
    pub fn file(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        CliError::File {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            CliError::Config(_)
            | CliError::File { .. }
            | CliError::Key(_) => ErrorClass::Configuration,
            CliError::Commitment(err) => err.class(),
            CliError::Aggregator(err) => err.class(),
            CliError::Pipeline(err) => err.class(),
            CliError::Token(err) => err.class(),
            CliError::Envelope(err) => err.class(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(class_exit_code(self.class()))
    }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}

/// `0` confirmed, `1` configuration, `2` rejected, `3` retry later.
pub const EXIT_CONFIRMED: u8 = 0;
pub const EXIT_CONFIGURATION: u8 = 1;
pub const EXIT_REJECTED: u8 = 2;
pub const EXIT_RETRY: u8 = 3;

pub fn class_exit_code(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Configuration => EXIT_CONFIGURATION,
        ErrorClass::Invalid => EXIT_REJECTED,
        ErrorClass::Transient | ErrorClass::NotYetIncluded => EXIT_RETRY,
    }
}
