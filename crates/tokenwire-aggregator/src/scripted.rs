//! Aggregator that replays a fixed script of answers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokenwire_types::{Commitment, InclusionProof, RequestId};

use crate::client::{AggregatorClient, ProofResponse, SubmitOutcome};
use crate::error::{AggregatorError, AggregatorResult};

/// Answers proof queries from a queue, then `NotFound` forever.
/// Submissions are accepted unless a submit answer was queued.
#[derive(Default)]
pub struct ScriptedAggregator {
    submits: Mutex<VecDeque<AggregatorResult<SubmitOutcome>>>,
    answers: Mutex<VecDeque<AggregatorResult<ProofResponse>>>,
    submit_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl ScriptedAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(
        answers: impl IntoIterator<Item = AggregatorResult<ProofResponse>>,
    ) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        }
    }

    /// `not_found` NotFound answers followed by `proof`.
    pub fn found_after(not_found: usize, proof: InclusionProof) -> Self {
        Self::with_answers(
            std::iter::repeat_with(|| Ok(ProofResponse::NotFound))
                .take(not_found)
                .chain(std::iter::once(Ok(ProofResponse::Found(proof)))),
        )
    }

    pub fn push_submit(&self, outcome: AggregatorResult<SubmitOutcome>) {
        if let Ok(mut submits) = self.submits.lock() {
            submits.push_back(outcome);
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

fn poisoned() -> AggregatorError {
    AggregatorError::Protocol("script lock poisoned".into())
}

#[async_trait]
impl AggregatorClient for ScriptedAggregator {
    async fn submit(&self, _commitment: &Commitment) -> AggregatorResult<SubmitOutcome> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.submits.lock().map_err(|_| poisoned())?.pop_front();
        next.unwrap_or(Ok(SubmitOutcome::Accepted))
    }

    async fn query_proof(&self, _request_id: &RequestId) -> AggregatorResult<ProofResponse> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.answers.lock().map_err(|_| poisoned())?.pop_front();
        next.unwrap_or(Ok(ProofResponse::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenwire_types::{ClientSignature, DataHash, PublicKey};

    #[tokio::test]
    async fn replays_then_not_found() {
        let script = ScriptedAggregator::found_after(2, InclusionProof::default());
        let id = RequestId::from_bytes([1; 32]);
        assert_eq!(script.query_proof(&id).await.unwrap(), ProofResponse::NotFound);
        assert_eq!(script.query_proof(&id).await.unwrap(), ProofResponse::NotFound);
        assert!(matches!(
            script.query_proof(&id).await.unwrap(),
            ProofResponse::Found(_)
        ));
        assert_eq!(script.query_proof(&id).await.unwrap(), ProofResponse::NotFound);
        assert_eq!(script.query_calls(), 4);

        let c = Commitment::new(
            PublicKey::from_bytes([1; 32]),
            DataHash::ZERO,
            ClientSignature::from_bytes([0; 64]),
        );
        script.push_submit(Ok(SubmitOutcome::Duplicate));
        assert_eq!(script.submit(&c).await.unwrap(), SubmitOutcome::Duplicate);
        assert_eq!(script.submit(&c).await.unwrap(), SubmitOutcome::Accepted);
    }
}
