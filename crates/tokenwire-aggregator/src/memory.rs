//! In-process aggregator that builds and certifies real proofs.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokenwire_crypto::{Ed25519Verifier, Verifier};
use tokenwire_types::{Commitment, DataHash, InclusionProof, RequestId, RootCertificate};
use tracing::{debug, info};

use crate::client::{AggregatorClient, ProofResponse, SubmitOutcome};
use crate::error::{AggregatorError, AggregatorResult};
use crate::network::TestNetwork;
use crate::tree::SparseTree;

const INTERNAL_ERROR: i64 = -32603;

#[derive(Default)]
struct Ledger {
    round: u64,
    pending: BTreeMap<RequestId, Commitment>,
    included: BTreeMap<RequestId, Commitment>,
    sealed: Option<SealedRound>,
    queries_since_seal: u32,
}

struct SealedRound {
    tree: SparseTree,
    certificate: RootCertificate,
}

/// Aggregator that keeps submissions pending until [`InMemoryAggregator::seal_round`].
///
/// Checks every submission the way a real aggregator would: the request id
/// must be recomputable and the client signature must verify over the
/// state hash.
pub struct InMemoryAggregator {
    network: Arc<TestNetwork>,
    verifier: Ed25519Verifier,
    auto_seal_after: Option<u32>,
    ledger: RwLock<Ledger>,
}

impl InMemoryAggregator {
    pub fn new(network: Arc<TestNetwork>) -> Self {
        Self {
            network,
            verifier: Ed25519Verifier,
            auto_seal_after: None,
            ledger: RwLock::new(Ledger::default()),
        }
    }

    /// Seal a round by itself once pending work has been queried `queries` times.
    pub fn auto_seal_after(mut self, queries: u32) -> Self {
        self.auto_seal_after = Some(queries);
        self
    }

    pub fn network(&self) -> &TestNetwork {
        &self.network
    }

    pub fn pending_count(&self) -> AggregatorResult<usize> {
        Ok(self.read()?.pending.len())
    }

    /// Move every pending commitment into the tree and certify the new root.
    ///
    /// Returns `None` when nothing was pending.
    pub fn seal_round(&self) -> AggregatorResult<Option<RootCertificate>> {
        let mut ledger = self.write()?;
        Ok(self.seal_locked(&mut ledger))
    }

    fn seal_locked(&self, ledger: &mut Ledger) -> Option<RootCertificate> {
        if ledger.pending.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut ledger.pending);
        ledger.included.extend(pending);
        ledger.round += 1;
        ledger.queries_since_seal = 0;

        let entries: BTreeMap<RequestId, DataHash> = ledger
            .included
            .iter()
            .map(|(id, commitment)| (*id, commitment.transaction_hash()))
            .collect();
        let tree = SparseTree::build(&entries);
        let certificate =
            self.network
                .certify(ledger.round, tree.root(), self.network.validators().len());

        info!(
            round = ledger.round,
            leaves = tree.len(),
            root = %tree.root(),
            "Round sealed"
        );
        ledger.sealed = Some(SealedRound {
            tree,
            certificate: certificate.clone(),
        });
        Some(certificate)
    }

    fn proof_for(&self, ledger: &Ledger, request_id: &RequestId) -> Option<InclusionProof> {
        let commitment = ledger.included.get(request_id)?;
        let sealed = ledger.sealed.as_ref()?;
        Some(InclusionProof {
            merkle_path: sealed.tree.path(request_id),
            transaction_hash: Some(commitment.transaction_hash()),
            authenticator: self.network.authenticate(commitment),
            certificate: Some(sealed.certificate.clone()),
        })
    }

    fn read(&self) -> AggregatorResult<std::sync::RwLockReadGuard<'_, Ledger>> {
        self.ledger.read().map_err(|_| lock_error())
    }

    fn write(&self) -> AggregatorResult<std::sync::RwLockWriteGuard<'_, Ledger>> {
        self.ledger.write().map_err(|_| lock_error())
    }
}

fn lock_error() -> AggregatorError {
    AggregatorError::Server {
        code: INTERNAL_ERROR,
        message: "ledger lock poisoned".into(),
    }
}

#[async_trait]
impl AggregatorClient for InMemoryAggregator {
    async fn submit(&self, commitment: &Commitment) -> AggregatorResult<SubmitOutcome> {
        if !commitment.verify_request_id() {
            return Err(AggregatorError::Rejected("REQUEST_ID_MISMATCH".into()));
        }
        if !self.verifier.verify(
            commitment.public_key(),
            commitment.state_hash(),
            commitment.signature().as_bytes(),
        ) {
            return Err(AggregatorError::Rejected(
                "SIGNATURE_VERIFICATION_FAILED".into(),
            ));
        }

        let mut ledger = self.write()?;
        let id = *commitment.request_id();
        if ledger.pending.contains_key(&id) || ledger.included.contains_key(&id) {
            debug!(request_id = %id, "Duplicate submission");
            return Ok(SubmitOutcome::Duplicate);
        }
        ledger.pending.insert(id, commitment.clone());
        debug!(request_id = %id, "Commitment accepted");
        Ok(SubmitOutcome::Accepted)
    }

    async fn query_proof(&self, request_id: &RequestId) -> AggregatorResult<ProofResponse> {
        let mut ledger = self.write()?;
        if ledger.pending.contains_key(request_id) {
            ledger.queries_since_seal += 1;
            if let Some(threshold) = self.auto_seal_after {
                if ledger.queries_since_seal >= threshold {
                    self.seal_locked(&mut ledger);
                }
            }
        }
        Ok(match self.proof_for(&ledger, request_id) {
            Some(proof) => ProofResponse::Found(proof),
            None => ProofResponse::NotFound,
        })
    }
}
