//! JSON files on disk: keys, tokens, envelopes, proofs, trust bases.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokenwire_crypto::{Ed25519Signer, Signer};
use tokenwire_types::PublicKey;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CliError, CliResult};

pub fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::file(path, e))?;
    serde_json::from_str(&contents).map_err(|e| CliError::file(path, e))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::file(path, e))?;
    write_text(path, &json)
}

pub fn write_text(path: &Path, contents: &str) -> CliResult<()> {
    std::fs::write(path, contents).map_err(|e| CliError::file(path, e))
}

/// On-disk signing key. The public key is informational; the secret is
/// authoritative and wiped when the value is dropped.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyFile {
    #[zeroize(skip)]
    pub public_key: PublicKey,
    pub secret_key: String,
}

impl KeyFile {
    pub fn from_signer(signer: &Ed25519Signer) -> Self {
        Self {
            public_key: signer.public_key(),
            secret_key: signer.secret_hex().as_str().to_owned(),
        }
    }
}

pub fn read_signer(path: &Path) -> CliResult<Ed25519Signer> {
    let key: KeyFile = read_json(path)?;
    let signer = Ed25519Signer::from_secret_hex(&key.secret_key)?;
    if signer.public_key() != key.public_key {
        return Err(CliError::file(
            path,
            "public key does not match the secret key",
        ));
    }
    Ok(signer)
}
