//! Trust-base validation of inclusion proofs.
//!
//! Checks run in a fixed order and the first failure decides the verdict:
//!
//! 1. every required part is present, otherwise `Incomplete`
//! 2. the authenticator binds the queried request id (and the expected state)
//! 3. the authenticator signature comes from a trust-base member and covers
//!    the transaction hash
//! 4. the Merkle path is well formed
//! 5. the path folds to the certified root and the certificate carries a quorum
//!
//! No network I/O happens here.

use std::collections::BTreeSet;

use tokenwire_crypto::{Ed25519Verifier, Verifier};
use tokenwire_types::{
    Commitment, CompleteProof, DataHash, InclusionProof, IncompleteReason, RejectReason,
    RequestId, SignatureFault, TrustBase, ValidationVerdict, VerificationStatus,
};
use tracing::{debug, warn};

/// What the caller expects the proof to prove.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationContext {
    pub request_id: RequestId,
    /// When set, the authenticator must attest exactly this state hash.
    pub expected_state_hash: Option<DataHash>,
}

impl ValidationContext {
    pub fn for_request(request_id: RequestId) -> Self {
        Self {
            request_id,
            expected_state_hash: None,
        }
    }

    pub fn for_commitment(commitment: &Commitment) -> Self {
        Self {
            request_id: *commitment.request_id(),
            expected_state_hash: Some(*commitment.state_hash()),
        }
    }
}

/// Classifies proofs against a trust base it owns.
#[derive(Clone, Debug)]
pub struct ProofValidator<V = Ed25519Verifier> {
    trust_base: TrustBase,
    verifier: V,
}

impl ProofValidator<Ed25519Verifier> {
    pub fn new(trust_base: TrustBase) -> Self {
        Self::with_verifier(trust_base, Ed25519Verifier)
    }
}

impl<V: Verifier> ProofValidator<V> {
    pub fn with_verifier(trust_base: TrustBase, verifier: V) -> Self {
        Self {
            trust_base,
            verifier,
        }
    }

    pub fn trust_base(&self) -> &TrustBase {
        &self.trust_base
    }

    /// Classify `proof` for `context`.
    pub fn validate(&self, proof: &InclusionProof, context: &ValidationContext) -> ValidationVerdict {
        let verdict = self.classify(proof, context);
        match &verdict {
            ValidationVerdict::Confirmed => {
                debug!(request_id = %context.request_id, "Proof confirmed");
            }
            ValidationVerdict::Incomplete(reason) => {
                debug!(request_id = %context.request_id, ?reason, "Proof incomplete");
            }
            ValidationVerdict::Rejected(reason) => {
                warn!(
                    request_id = %context.request_id,
                    code = reason.code(),
                    %reason,
                    "Proof rejected"
                );
            }
        }
        verdict
    }

    fn classify(&self, proof: &InclusionProof, context: &ValidationContext) -> ValidationVerdict {
        let proof = match proof.complete() {
            Ok(proof) => proof,
            Err(field) => {
                return ValidationVerdict::Incomplete(IncompleteReason::MissingField(field))
            }
        };

        if let Err(reason) = self.check_binding(&proof, context) {
            return ValidationVerdict::Rejected(reason);
        }
        if let Err(reason) = self.check_authenticator(&proof) {
            return ValidationVerdict::Rejected(reason);
        }
        if let Err(defect) = proof.merkle_path.check_structure() {
            return ValidationVerdict::Rejected(RejectReason::MalformedPath { defect });
        }

        let status = verify_inclusion(&proof, &context.request_id, &self.trust_base, &self.verifier);
        if !status.is_ok() {
            return ValidationVerdict::Rejected(RejectReason::VerificationFailed { status });
        }
        ValidationVerdict::Confirmed
    }

    fn check_binding(
        &self,
        proof: &CompleteProof<'_>,
        context: &ValidationContext,
    ) -> Result<(), RejectReason> {
        let authenticator = proof.authenticator;
        let bound = RequestId::derive(&authenticator.public_key, &authenticator.state_hash);
        if bound != context.request_id {
            return Err(RejectReason::RequestIdMismatch {
                expected: context.request_id,
                actual: bound,
            });
        }
        if let Some(expected) = context.expected_state_hash {
            if authenticator.state_hash != expected {
                return Err(RejectReason::StateBindingMismatch {
                    expected,
                    actual: authenticator.state_hash,
                });
            }
        }
        Ok(())
    }

    fn check_authenticator(&self, proof: &CompleteProof<'_>) -> Result<(), RejectReason> {
        let authenticator = proof.authenticator;
        let fault = if !self.trust_base.is_validator(&authenticator.signer) {
            Some(SignatureFault::UnknownSigner)
        } else if !self.verifier.verify(
            &authenticator.signer,
            proof.transaction_hash,
            authenticator.signature.as_bytes(),
        ) {
            Some(SignatureFault::InvalidSignature)
        } else {
            None
        };
        match fault {
            Some(fault) => Err(RejectReason::BadSignature {
                signer: authenticator.signer,
                fault,
            }),
            None => Ok(()),
        }
    }
}

/// Cryptographic inclusion check of a complete proof against `trust_base`.
///
/// Folds the path for `request_id`, compares it with the claimed and the
/// certified root, and counts distinct trust-base validators whose
/// signature over the certificate message verifies.
pub fn verify_inclusion(
    proof: &CompleteProof<'_>,
    request_id: &RequestId,
    trust_base: &TrustBase,
    verifier: &dyn Verifier,
) -> VerificationStatus {
    let path = proof.merkle_path;
    let certificate = proof.certificate;

    let computed = path.compute_root(request_id, proof.transaction_hash);
    if computed != path.root {
        return VerificationStatus::PathRootMismatch {
            claimed: path.root,
            computed,
        };
    }
    if certificate.root != path.root {
        return VerificationStatus::CertificateRootMismatch {
            path_root: path.root,
            certified_root: certificate.root,
        };
    }
    if certificate.network_id != trust_base.network_id() {
        return VerificationStatus::NetworkMismatch {
            expected: trust_base.network_id(),
            actual: certificate.network_id,
        };
    }

    let message = certificate.message();
    let mut signed = BTreeSet::new();
    for entry in &certificate.signatures {
        if signed.contains(&entry.validator) || !trust_base.is_validator(&entry.validator) {
            continue;
        }
        if verifier.verify(&entry.validator, &message, entry.signature.as_bytes()) {
            signed.insert(entry.validator);
        }
    }
    if signed.len() < trust_base.quorum_threshold() {
        return VerificationStatus::InsufficientQuorum {
            valid: signed.len(),
            required: trust_base.quorum_threshold(),
        };
    }
    VerificationStatus::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use tokenwire_aggregator::{SparseTree, TestNetwork};
    use tokenwire_crypto::{Ed25519Signer, NetworkKeyPair, Signer};
    use tokenwire_types::{
        Authenticator, MerkleStep, NetworkSignature, PathDefect, ProofField, PublicKey,
        ValidatorSignature,
    };

    fn commitment(seed: u8) -> Commitment {
        let signer = Ed25519Signer::from_secret_bytes(&[seed; 32]);
        let state = DataHash::digest(&[seed, 0xaa]);
        Commitment::new(signer.public_key(), state, signer.sign(&state).unwrap())
    }

    /// A correct proof for `commitment(1)` in a tree of four commitments.
    fn fixture(network: &TestNetwork, signers: usize) -> (Commitment, InclusionProof) {
        let commitments: Vec<Commitment> = (1..=4).map(commitment).collect();
        let entries: BTreeMap<RequestId, DataHash> = commitments
            .iter()
            .map(|c| (*c.request_id(), c.transaction_hash()))
            .collect();
        let tree = SparseTree::build(&entries);
        let target = commitments[0].clone();
        let proof = InclusionProof {
            merkle_path: tree.path(target.request_id()),
            transaction_hash: Some(target.transaction_hash()),
            authenticator: network.authenticate(&target),
            certificate: Some(network.certify(1, tree.root(), signers)),
        };
        (target, proof)
    }

    fn setup() -> (TestNetwork, ProofValidator, Commitment, InclusionProof) {
        let network = TestNetwork::new(9, 4, 3).unwrap();
        let validator = ProofValidator::new(network.trust_base().clone());
        let (c, proof) = fixture(&network, 4);
        (network, validator, c, proof)
    }

    fn rejected(verdict: ValidationVerdict) -> RejectReason {
        match verdict {
            ValidationVerdict::Rejected(reason) => reason,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn correct_proof_confirms() {
        let (_, validator, c, proof) = setup();
        assert_eq!(
            validator.validate(&proof, &ValidationContext::for_commitment(&c)),
            ValidationVerdict::Confirmed
        );
        assert!(validator
            .validate(&proof, &ValidationContext::for_request(*c.request_id()))
            .is_confirmed());
    }

    #[test]
    fn missing_parts_are_incomplete_never_rejected() {
        let (_, validator, c, proof) = setup();
        let ctx = ValidationContext::for_commitment(&c);

        let mut no_auth = proof.clone();
        no_auth.authenticator = None;
        assert_eq!(
            validator.validate(&no_auth, &ctx),
            ValidationVerdict::Incomplete(IncompleteReason::MissingField(
                ProofField::Authenticator
            ))
        );

        let mut no_tx = proof.clone();
        no_tx.transaction_hash = None;
        no_tx.merkle_path = None;
        assert_eq!(
            validator.validate(&no_tx, &ctx),
            ValidationVerdict::Incomplete(IncompleteReason::MissingField(
                ProofField::TransactionHash
            ))
        );

        let mut no_cert = proof;
        no_cert.certificate = None;
        assert!(matches!(
            validator.validate(&no_cert, &ctx),
            ValidationVerdict::Incomplete(_)
        ));
    }

    #[test]
    fn proof_for_other_request_is_mismatch() {
        let (_, validator, _, proof) = setup();
        let other = commitment(2);
        let ctx = ValidationContext::for_request(*other.request_id());
        let reason = rejected(validator.validate(&proof, &ctx));
        assert_eq!(reason.code(), "request_id_mismatch");
    }

    #[test]
    fn unexpected_state_is_binding_mismatch() {
        let (_, validator, c, proof) = setup();
        let ctx = ValidationContext {
            request_id: *c.request_id(),
            expected_state_hash: Some(DataHash::digest(b"some other state")),
        };
        assert!(matches!(
            rejected(validator.validate(&proof, &ctx)),
            RejectReason::StateBindingMismatch { .. }
        ));
    }

    #[test]
    fn client_signature_substituted_for_authenticator_is_rejected() {
        let (_, validator, c, mut proof) = setup();
        let client = Ed25519Signer::from_secret_bytes(&[1; 32]);
        let forged = client.sign(&c.transaction_hash()).unwrap();
        proof.authenticator = Some(Authenticator {
            signer: client.public_key(),
            public_key: *c.public_key(),
            state_hash: *c.state_hash(),
            signature: NetworkSignature::from_bytes(*forged.as_bytes()),
        });
        assert_eq!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::BadSignature {
                signer: client.public_key(),
                fault: SignatureFault::UnknownSigner,
            }
        );
    }

    #[test]
    fn authenticator_over_wrong_hash_is_rejected() {
        let (network, validator, c, mut proof) = setup();
        let mut auth = network.authenticate(&c).unwrap();
        auth.signature = network.validators()[0].sign(&DataHash::digest(b"elsewhere"));
        proof.authenticator = Some(auth);
        assert!(matches!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::BadSignature {
                fault: SignatureFault::InvalidSignature,
                ..
            }
        ));
    }

    #[test]
    fn malformed_path_is_rejected_before_hashing() {
        let (_, validator, c, mut proof) = setup();
        let path = proof.merkle_path.as_mut().unwrap();
        path.steps.push(MerkleStep {
            depth: 300,
            sibling: DataHash::digest(b"s"),
        });
        assert_eq!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::MalformedPath {
                defect: PathDefect::DepthOutOfRange { depth: 300 }
            }
        );
    }

    #[test]
    fn forged_root_fails_verification() {
        let (network, validator, c, mut proof) = setup();
        let forged_root = DataHash::digest(b"forged root");
        proof.merkle_path.as_mut().unwrap().root = forged_root;
        proof.certificate = Some(network.certify(1, forged_root, 4));
        assert!(matches!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::VerificationFailed {
                status: VerificationStatus::PathRootMismatch { .. }
            }
        ));
    }

    #[test]
    fn certificate_for_other_root_fails_verification() {
        let (network, validator, c, mut proof) = setup();
        proof.certificate = Some(network.certify(1, DataHash::digest(b"other"), 4));
        assert!(matches!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::VerificationFailed {
                status: VerificationStatus::CertificateRootMismatch { .. }
            }
        ));
    }

    #[test]
    fn foreign_network_certificate_fails_verification() {
        let (_, validator, c, mut proof) = setup();
        proof.certificate.as_mut().unwrap().network_id = 10;
        assert_eq!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::VerificationFailed {
                status: VerificationStatus::NetworkMismatch {
                    expected: 9,
                    actual: 10
                }
            }
        );
    }

    #[test]
    fn repeated_and_unknown_signers_do_not_count() {
        let (_, validator, c, mut proof) = setup();
        let cert = proof.certificate.as_mut().unwrap();
        let first = cert.signatures[0].clone();
        let outsider = NetworkKeyPair::from_secret_bytes(&[77; 32]);
        let outsider_sig = ValidatorSignature {
            validator: outsider.public_key(),
            signature: outsider.sign(&cert.message()),
        };
        cert.signatures = vec![first.clone(), first.clone(), first, outsider_sig];
        assert_eq!(
            rejected(validator.validate(&proof, &ValidationContext::for_commitment(&c))),
            RejectReason::VerificationFailed {
                status: VerificationStatus::InsufficientQuorum {
                    valid: 1,
                    required: 3
                }
            }
        );
    }

    #[test]
    fn verifier_is_pluggable() {
        struct RejectAll;
        impl Verifier for RejectAll {
            fn verify(&self, _: &PublicKey, _: &DataHash, _: &[u8; 64]) -> bool {
                false
            }
        }
        let (network, _, c, proof) = setup();
        let validator = ProofValidator::with_verifier(network.trust_base().clone(), RejectAll);
        assert!(validator
            .validate(&proof, &ValidationContext::for_commitment(&c))
            .is_rejected());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn quorum_decides_for_every_trust_base(
            (validators, threshold, signers) in (1usize..6)
                .prop_flat_map(|n| (Just(n), 1..=n))
                .prop_flat_map(|(n, t)| (Just(n), Just(t), 0..=n))
        ) {
            let network = TestNetwork::new(3, validators, threshold).unwrap();
            let validator = ProofValidator::new(network.trust_base().clone());
            let (c, proof) = fixture(&network, signers);
            let verdict = validator.validate(&proof, &ValidationContext::for_commitment(&c));
            if signers >= threshold {
                prop_assert_eq!(verdict, ValidationVerdict::Confirmed);
            } else {
                prop_assert_eq!(
                    verdict,
                    ValidationVerdict::Rejected(RejectReason::VerificationFailed {
                        status: VerificationStatus::InsufficientQuorum {
                            valid: signers,
                            required: threshold,
                        },
                    })
                );
            }
        }
    }
}
