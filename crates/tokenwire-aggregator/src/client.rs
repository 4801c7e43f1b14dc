use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokenwire_types::{Commitment, InclusionProof, RequestId};

use crate::error::AggregatorResult;

/// Outcome of submitting a commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted,
    /// The request id is already known. Treated as accepted.
    Duplicate,
}

/// The aggregator's answer to a proof query, as received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProofResponse {
    /// A proof object, possibly with parts still missing.
    Found(InclusionProof),
    NotFound,
}

/// The two calls the pipeline makes against the network.
#[async_trait]
pub trait AggregatorClient: Send + Sync {
    /// Submit a commitment for inclusion.
    async fn submit(&self, commitment: &Commitment) -> AggregatorResult<SubmitOutcome>;

    /// Ask for the inclusion proof of `request_id`.
    async fn query_proof(&self, request_id: &RequestId) -> AggregatorResult<ProofResponse>;
}

#[async_trait]
impl<C: AggregatorClient + ?Sized> AggregatorClient for Arc<C> {
    async fn submit(&self, commitment: &Commitment) -> AggregatorResult<SubmitOutcome> {
        (**self).submit(commitment).await
    }

    async fn query_proof(&self, request_id: &RequestId) -> AggregatorResult<ProofResponse> {
        (**self).query_proof(request_id).await
    }
}
