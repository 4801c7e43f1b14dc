use thiserror::Error;
use tokenwire_types::{ErrorClass, HexError};

/// Errors from a signing capability. Always a configuration problem: the
/// pipeline never retries them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("signing key unavailable: {0}")]
    Unavailable(String),

    #[error("signing backend failure: {0}")]
    Backend(String),
}

impl SignerError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}

/// Errors from loading key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key encoding: {0}")]
    Encoding(#[from] HexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signer_errors_are_configuration() {
        let err = SignerError::Unavailable("hsm offline".into());
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("hsm offline"));
    }
}
