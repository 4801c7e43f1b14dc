use thiserror::Error;
use tokenwire_crypto::SignerError;
use tokenwire_types::{ErrorClass, PredicateError, PublicKey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("signer failed: {0}")]
    Signer(#[from] SignerError),

    #[error("signer {signer} does not own the source state (owner {owner})")]
    NotOwner { owner: PublicKey, signer: PublicKey },

    #[error("invalid recipient predicate: {0}")]
    InvalidPredicate(#[from] PredicateError),

    #[error("signature does not verify under {public_key}")]
    SignatureMismatch { public_key: PublicKey },
}

impl CommitmentError {
    /// Every commitment failure is local; none is worth retrying.
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Configuration
    }
}
