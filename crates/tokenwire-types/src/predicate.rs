use serde::{Deserialize, Serialize};

use crate::hash::{DataHash, DomainHasher, Nonce};
use crate::keys::PublicKey;

const PREDICATE_DOMAIN: &str = "tokenwire/predicate";

/// Whether the owner's key is hidden behind a nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    Unmasked,
    Masked,
}

impl PredicateKind {
    fn tag(self) -> u8 {
        match self {
            PredicateKind::Unmasked => 0,
            PredicateKind::Masked => 1,
        }
    }
}

/// Ownership condition for the next transition of a token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredicateParams {
    pub kind: PredicateKind,
    pub public_key: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<Nonce>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateError {
    #[error("masked predicate requires a nonce")]
    MissingNonce,
    #[error("unmasked predicate must not carry a nonce")]
    UnexpectedNonce,
}

impl PredicateParams {
    pub fn unmasked(public_key: PublicKey) -> Self {
        Self {
            kind: PredicateKind::Unmasked,
            public_key,
            nonce: None,
        }
    }

    pub fn masked(public_key: PublicKey, nonce: Nonce) -> Self {
        Self {
            kind: PredicateKind::Masked,
            public_key,
            nonce: Some(nonce),
        }
    }

    pub fn validate(&self) -> Result<(), PredicateError> {
        match (self.kind, self.nonce) {
            (PredicateKind::Masked, None) => Err(PredicateError::MissingNonce),
            (PredicateKind::Unmasked, Some(_)) => Err(PredicateError::UnexpectedNonce),
            _ => Ok(()),
        }
    }

    /// Hash committed into transition state hashes.
    pub fn hash(&self) -> DataHash {
        let mut hasher = DomainHasher::new(PREDICATE_DOMAIN)
            .update(&[self.kind.tag()])
            .update(self.public_key.as_bytes());
        if let Some(nonce) = &self.nonce {
            hasher = hasher.update(nonce.as_bytes());
        }
        hasher.finalize()
    }

    pub fn is_owned_by(&self, key: &PublicKey) -> bool {
        &self.public_key == key
    }
}
