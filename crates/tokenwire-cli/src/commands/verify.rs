//! `tokenwire verify`

use std::path::PathBuf;

use clap::Args;
use tokenwire_proof::{ProofValidator, ValidationContext};
use tokenwire_types::{DataHash, InclusionProof, IncompleteReason, RequestId, ValidationVerdict};

use super::Report;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::files;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Stored inclusion proof (JSON)
    #[arg(long)]
    pub proof: PathBuf,

    /// Request id the proof must be for (hex)
    #[arg(long)]
    pub request_id: RequestId,

    /// State hash the authenticator must bind (hex)
    #[arg(long)]
    pub state_hash: Option<DataHash>,
}

pub fn execute(args: VerifyArgs, config: &CliConfig) -> CliResult<Report> {
    let proof: InclusionProof = files::read_json(&args.proof)?;
    let validator = ProofValidator::new(config.trust_base()?);
    let context = ValidationContext {
        request_id: args.request_id,
        expected_state_hash: args.state_hash,
    };

    let verdict = validator.validate(&proof, &context);
    match &verdict {
        ValidationVerdict::Confirmed => println!("confirmed"),
        ValidationVerdict::Incomplete(IncompleteReason::MissingField(field)) => {
            println!("incomplete: {field} missing")
        }
        ValidationVerdict::Rejected(reason) => println!("rejected [{}] {reason}", reason.code()),
    }
    Ok(Report::Verdict(verdict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use tokenwire_aggregator::{SparseTree, TestNetwork};
    use tokenwire_crypto::{Ed25519Signer, Signer};
    use tokenwire_types::Commitment;

    fn commitment() -> Commitment {
        let signer = Ed25519Signer::from_secret_bytes(&[8; 32]);
        let state = DataHash::digest(b"verify");
        Commitment::new(signer.public_key(), state, signer.sign(&state).unwrap())
    }

    fn setup(dir: &tempfile::TempDir, network: &TestNetwork, proof: &InclusionProof) -> (CliConfig, PathBuf) {
        let trust_base = dir.path().join("trust-base.json");
        files::write_json(&trust_base, network.trust_base()).unwrap();
        let proof_path = dir.path().join("proof.json");
        files::write_json(&proof_path, proof).unwrap();
        let config = CliConfig {
            trust_base_path: Some(trust_base),
            ..CliConfig::default()
        };
        (config, proof_path)
    }

    #[test]
    fn stored_proof_verdicts() {
        let network = TestNetwork::new(3, 3, 2).unwrap();
        let commitment = commitment();
        let entries: BTreeMap<RequestId, DataHash> =
            [(*commitment.request_id(), commitment.transaction_hash())].into();
        let tree = SparseTree::build(&entries);
        let mut proof = InclusionProof {
            merkle_path: tree.path(commitment.request_id()),
            transaction_hash: Some(commitment.transaction_hash()),
            authenticator: network.authenticate(&commitment),
            certificate: Some(network.certify(1, tree.root(), 2)),
        };

        let dir = tempfile::tempdir().unwrap();
        let (config, path) = setup(&dir, &network, &proof);
        let args = |state_hash| VerifyArgs {
            proof: path.clone(),
            request_id: *commitment.request_id(),
            state_hash,
        };
        assert_eq!(
            execute(args(Some(*commitment.state_hash())), &config).unwrap(),
            Report::Verdict(ValidationVerdict::Confirmed)
        );
        assert_eq!(
            execute(args(Some(DataHash::digest(b"other"))), &config)
                .unwrap()
                .exit_code(),
            2
        );

        proof.certificate = None;
        files::write_json(&path, &proof).unwrap();
        assert_eq!(execute(args(None), &config).unwrap().exit_code(), 3);
    }
}
