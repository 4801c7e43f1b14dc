use std::collections::BTreeMap;

use tokenwire_crypto::NetworkKeyPair;
use tokenwire_types::{
    Authenticator, Commitment, DataHash, DomainHasher, RootCertificate, TrustBase,
    TrustBaseError, ValidatorSignature,
};

const VALIDATOR_SEED_DOMAIN: &str = "tokenwire/test-validator";

/// A local consensus: validator keys plus the trust base that describes them.
///
/// The first validator doubles as the authenticator that signs transaction
/// hashes, so authenticator signatures come from a trust-base member.
pub struct TestNetwork {
    validators: Vec<NetworkKeyPair>,
    trust_base: TrustBase,
}

impl TestNetwork {
    /// Deterministic keys derived from `network_id` and the validator index.
    pub fn new(
        network_id: u32,
        validator_count: usize,
        quorum_threshold: usize,
    ) -> Result<Self, TrustBaseError> {
        let validators: Vec<NetworkKeyPair> = (0..validator_count)
            .map(|index| {
                let seed = DomainHasher::new(VALIDATOR_SEED_DOMAIN)
                    .update(&network_id.to_be_bytes())
                    .update(&(index as u64).to_be_bytes())
                    .finalize();
                NetworkKeyPair::from_secret_bytes(seed.as_bytes())
            })
            .collect();
        Self::from_keys(network_id, validators, quorum_threshold)
    }

    pub fn from_keys(
        network_id: u32,
        validators: Vec<NetworkKeyPair>,
        quorum_threshold: usize,
    ) -> Result<Self, TrustBaseError> {
        let members: BTreeMap<String, _> = validators
            .iter()
            .enumerate()
            .map(|(index, key)| (format!("validator-{index}"), key.public_key()))
            .collect();
        let trust_base = TrustBase::new(network_id, members, quorum_threshold)?;
        Ok(Self {
            validators,
            trust_base,
        })
    }

    pub fn trust_base(&self) -> &TrustBase {
        &self.trust_base
    }

    pub fn network_id(&self) -> u32 {
        self.trust_base.network_id()
    }

    pub fn validators(&self) -> &[NetworkKeyPair] {
        &self.validators
    }

    /// Sign `root` for `round` with the first `signers` validators.
    pub fn certify(&self, round: u64, root: DataHash, signers: usize) -> RootCertificate {
        let message = RootCertificate::signing_message(self.network_id(), round, &root);
        let signatures = self
            .validators
            .iter()
            .take(signers)
            .map(|key| ValidatorSignature {
                validator: key.public_key(),
                signature: key.sign(&message),
            })
            .collect();
        RootCertificate {
            network_id: self.network_id(),
            round,
            root,
            signatures,
        }
    }

    /// Network attestation over the commitment's transaction hash.
    pub fn authenticate(&self, commitment: &Commitment) -> Option<Authenticator> {
        let key = self.validators.first()?;
        Some(Authenticator {
            signer: key.public_key(),
            public_key: *commitment.public_key(),
            state_hash: *commitment.state_hash(),
            signature: key.sign(&commitment.transaction_hash()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_per_network() {
        let a = TestNetwork::new(1, 3, 2).unwrap();
        let b = TestNetwork::new(1, 3, 2).unwrap();
        let c = TestNetwork::new(2, 3, 2).unwrap();
        assert_eq!(a.trust_base(), b.trust_base());
        assert_ne!(
            a.validators()[0].public_key(),
            c.validators()[0].public_key()
        );
    }

    #[test]
    fn certify_limits_signers() {
        let net = TestNetwork::new(7, 4, 3).unwrap();
        let cert = net.certify(1, DataHash::digest(b"root"), 2);
        assert_eq!(cert.signatures.len(), 2);
        assert_eq!(cert.network_id, 7);
    }

    #[test]
    fn threshold_is_checked() {
        assert!(matches!(
            TestNetwork::new(1, 2, 3),
            Err(TrustBaseError::ThresholdTooHigh { .. })
        ));
    }
}
