use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::{DataHash, DomainHasher};
use crate::keys::{NetworkSignature, PublicKey};
use crate::merkle::MerklePath;

const CERTIFICATE_DOMAIN: &str = "tokenwire/certificate";

/// The network's signature over a proof's transaction hash, plus the
/// commitment binding (`public_key`, `state_hash`) it attests to.
///
/// `signer` is a consensus identity, never the committing client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticator {
    pub signer: PublicKey,
    pub public_key: PublicKey,
    pub state_hash: DataHash,
    pub signature: NetworkSignature,
}

/// One validator's signature over a certified root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSignature {
    pub validator: PublicKey,
    pub signature: NetworkSignature,
}

/// Quorum evidence that `root` was agreed upon in `round`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCertificate {
    pub network_id: u32,
    pub round: u64,
    pub root: DataHash,
    #[serde(default)]
    pub signatures: Vec<ValidatorSignature>,
}

impl RootCertificate {
    /// Message every validator signs for a certified root.
    pub fn signing_message(network_id: u32, round: u64, root: &DataHash) -> DataHash {
        DomainHasher::new(CERTIFICATE_DOMAIN)
            .update(&network_id.to_be_bytes())
            .update(&round.to_be_bytes())
            .update(root.as_bytes())
            .finalize()
    }

    pub fn message(&self) -> DataHash {
        Self::signing_message(self.network_id, self.round, &self.root)
    }
}

/// The four independently checkable parts of an inclusion proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofField {
    TransactionHash,
    Authenticator,
    MerklePath,
    Certificate,
}

impl fmt::Display for ProofField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProofField::TransactionHash => "transaction_hash",
            ProofField::Authenticator => "authenticator",
            ProofField::MerklePath => "merkle_path",
            ProofField::Certificate => "certificate",
        };
        f.write_str(name)
    }
}

/// The aggregator's answer for one request id, as received.
///
/// Every part may be missing while the network is still working on it.
/// Only a proof for which [`InclusionProof::complete`] succeeds can reach
/// the signature and Merkle checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    #[serde(default)]
    pub merkle_path: Option<MerklePath>,
    #[serde(default)]
    pub transaction_hash: Option<DataHash>,
    #[serde(default)]
    pub authenticator: Option<Authenticator>,
    #[serde(default)]
    pub certificate: Option<RootCertificate>,
}

/// Borrowed view of a proof with every required part present.
#[derive(Clone, Copy, Debug)]
pub struct CompleteProof<'a> {
    pub transaction_hash: &'a DataHash,
    pub authenticator: &'a Authenticator,
    pub merkle_path: &'a MerklePath,
    pub certificate: &'a RootCertificate,
}

impl InclusionProof {
    /// First missing required part, in validation order.
    pub fn missing_field(&self) -> Option<ProofField> {
        self.complete().err()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    pub fn complete(&self) -> Result<CompleteProof<'_>, ProofField> {
        let transaction_hash = self
            .transaction_hash
            .as_ref()
            .ok_or(ProofField::TransactionHash)?;
        let authenticator = self
            .authenticator
            .as_ref()
            .ok_or(ProofField::Authenticator)?;
        let merkle_path = self.merkle_path.as_ref().ok_or(ProofField::MerklePath)?;
        let certificate = self.certificate.as_ref().ok_or(ProofField::Certificate)?;
        Ok(CompleteProof {
            transaction_hash,
            authenticator,
            merkle_path,
            certificate,
        })
    }
}
