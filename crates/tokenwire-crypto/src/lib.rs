//! # tokenwire-crypto
//!
//! Narrow capability interfaces for the signing primitives the pipeline
//! consumes, plus an Ed25519 adapter:
//!
//! - [`Signer`]: the client's signing capability (produces [`ClientSignature`])
//! - [`Verifier`]: signature verification over a 32-byte hash
//! - [`Ed25519Signer`], [`Ed25519Verifier`]: `ed25519-dalek` implementations
//! - [`NetworkKeyPair`]: a consensus-side key that can only produce
//!   [`NetworkSignature`](tokenwire_types::NetworkSignature)s (used by the in-memory aggregator and tests)
//!
//! The rest of the workspace depends only on the traits, so the underlying
//! library can be swapped without touching the pipeline.

pub mod ed25519;
pub mod error;

pub use ed25519::{Ed25519Signer, Ed25519Verifier, NetworkKeyPair};
pub use error::{KeyError, SignerError};

use tokenwire_types::{ClientSignature, DataHash, PublicKey};

/// The client's signing capability.
pub trait Signer: Send + Sync {
    /// Public key matching the signatures this signer produces.
    fn public_key(&self) -> PublicKey;

    /// Sign exactly `hash`.
    fn sign(&self, hash: &DataHash) -> Result<ClientSignature, SignerError>;
}

/// Signature verification over a 32-byte hash.
pub trait Verifier: Send + Sync {
    fn verify(&self, public_key: &PublicKey, message: &DataHash, signature: &[u8; 64]) -> bool;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn public_key(&self) -> PublicKey {
        (**self).public_key()
    }

    fn sign(&self, hash: &DataHash) -> Result<ClientSignature, SignerError> {
        (**self).sign(hash)
    }
}

impl<V: Verifier + ?Sized> Verifier for std::sync::Arc<V> {
    fn verify(&self, public_key: &PublicKey, message: &DataHash, signature: &[u8; 64]) -> bool {
        (**self).verify(public_key, message, signature)
    }
}
