use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use tokenwire_types::{ClientSignature, DataHash, HexError, NetworkSignature, PublicKey};
use zeroize::Zeroizing;

use crate::error::{KeyError, SignerError};
use crate::{Signer, Verifier};

/// Client signing capability backed by an in-process Ed25519 key.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    pub fn from_secret_hex(secret: &str) -> Result<Self, KeyError> {
        if secret.len() != 64 {
            return Err(HexError::InvalidLength {
                expected: 64,
                actual: secret.len(),
            }
            .into());
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(secret, &mut bytes[..]).map_err(|_| HexError::InvalidHex)?;
        Ok(Self::from_secret_bytes(&bytes))
    }

    /// Hex encoding of the secret key, wiped on drop.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.as_bytes()))
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.key.verifying_key().to_bytes())
    }

    fn sign(&self, hash: &DataHash) -> Result<ClientSignature, SignerError> {
        let signature = self.key.sign(hash.as_bytes());
        Ok(ClientSignature::from_bytes(signature.to_bytes()))
    }
}

/// Consensus-side key. Produces only [`NetworkSignature`]s.
pub struct NetworkKeyPair {
    key: SigningKey,
}

impl NetworkKeyPair {
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(secret),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(self.key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &DataHash) -> NetworkSignature {
        NetworkSignature::from_bytes(self.key.sign(message.as_bytes()).to_bytes())
    }
}

/// Strict Ed25519 verification (rejects small-order keys and
/// non-canonical signatures).
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl Verifier for Ed25519Verifier {
    fn verify(&self, public_key: &PublicKey, message: &DataHash, signature: &[u8; 64]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
            tracing::debug!(key = %public_key, "rejecting undecodable public key");
            return false;
        };
        let signature = Signature::from_bytes(signature);
        key.verify_strict(message.as_bytes(), &signature).is_ok()
    }
}
