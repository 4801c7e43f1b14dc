use thiserror::Error;
use tokenwire_types::ErrorClass;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("invalid poller setting {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("poller stopped without a terminal outcome")]
    Unfinished,
}

impl PollError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}
