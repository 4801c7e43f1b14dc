//! Submit, poll, validate, apply.

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tokenwire_aggregator::{AggregatorClient, AggregatorError, SubmitOutcome};
use tokenwire_crypto::Verifier;
use tokenwire_proof::{poll_for_proof, PollError, PollOutcome, PollerConfig, ProofValidator};
use tokenwire_types::{ErrorClass, InclusionProof, ValidationVerdict};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::token::{RejectionCause, Token, TokenStateError, TokenStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Submission failed for a reason worth retrying later.
    #[error("submission failed: {0}")]
    Submit(#[from] AggregatorError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Token(#[from] TokenStateError),
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Submit(err) => err.class(),
            PipelineError::Poll(err) => err.class(),
            PipelineError::Token(err) => err.class(),
        }
    }
}

/// Where a transition ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    Confirmed,
    Rejected(RejectionCause),
}

impl TransitionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TransitionOutcome::Confirmed)
    }
}

/// Drives one token's pending transition to a terminal state.
///
/// Borrows the client and validator, so many pipelines can share them.
pub struct TransitionPipeline<'a, C: ?Sized, V = tokenwire_crypto::Ed25519Verifier> {
    client: &'a C,
    validator: &'a ProofValidator<V>,
    poller: &'a PollerConfig,
}

impl<'a, C, V> TransitionPipeline<'a, C, V>
where
    C: AggregatorClient + ?Sized,
    V: Verifier,
{
    pub fn new(client: &'a C, validator: &'a ProofValidator<V>, poller: &'a PollerConfig) -> Self {
        Self {
            client,
            validator,
            poller,
        }
    }

    pub fn validator(&self) -> &ProofValidator<V> {
        self.validator
    }

    /// Submit the pending commitment. `Duplicate` counts as accepted.
    ///
    /// A transient failure leaves the token in `Draft` so the same
    /// commitment can be submitted again.
    pub async fn submit(&self, token: &mut Token) -> Result<Option<TransitionOutcome>, PipelineError> {
        let commitment = token
            .pending()
            .map(|pending| pending.commitment.clone())
            .ok_or(TokenStateError::NoPendingTransition)?;

        match self.client.submit(&commitment).await {
            Ok(outcome) => {
                info!(
                    token_id = %token.id(),
                    request_id = %commitment.request_id(),
                    duplicate = outcome == SubmitOutcome::Duplicate,
                    "Commitment submitted"
                );
                token.mark_submitted()?;
                Ok(None)
            }
            Err(AggregatorError::Rejected(status)) => {
                let cause = RejectionCause::Refused { status };
                token.reject(cause.clone(), Utc::now())?;
                Ok(Some(TransitionOutcome::Rejected(cause)))
            }
            Err(err) => {
                warn!(token_id = %token.id(), error = %err, "Submission failed");
                Err(err.into())
            }
        }
    }

    /// Poll for the proof of a submitted transition and settle it.
    pub async fn await_confirmation(
        &self,
        token: &mut Token,
        cancel: &CancellationToken,
    ) -> Result<TransitionOutcome, PipelineError> {
        let request_id = token
            .pending()
            .map(|pending| *pending.commitment.request_id())
            .ok_or(TokenStateError::NoPendingTransition)?;
        if token.status() == TokenStatus::Submitted {
            token.mark_awaiting_proof()?;
        }

        let cause = match poll_for_proof(self.client, &request_id, self.poller, cancel).await? {
            PollOutcome::Ready(proof) => return self.settle(token, proof),
            PollOutcome::Timeout { attempts } => RejectionCause::Timeout { attempts },
            PollOutcome::Fatal(err) => RejectionCause::Fatal {
                class: err.class(),
                error: err.to_string(),
            },
            PollOutcome::Cancelled => RejectionCause::Cancelled,
        };
        token.reject(cause.clone(), Utc::now())?;
        Ok(TransitionOutcome::Rejected(cause))
    }

    /// Validate `proof` against the token's pending transition and apply it.
    ///
    /// Only called with complete proofs, so `Incomplete` cannot come back
    /// from the validator here. If it does, the token stays untouched and the
    /// caller sees an error.
    pub fn settle(&self, token: &mut Token, proof: InclusionProof) -> Result<TransitionOutcome, PipelineError> {
        match token.settle(proof, self.validator, Utc::now())? {
            ValidationVerdict::Confirmed => Ok(TransitionOutcome::Confirmed),
            ValidationVerdict::Rejected(reason) => {
                Ok(TransitionOutcome::Rejected(RejectionCause::Verdict { reason }))
            }
            ValidationVerdict::Incomplete(_) => Err(TokenStateError::InvalidTransition {
                status: token.status(),
                action: "settle an incomplete proof for",
            }
            .into()),
        }
    }

    /// Submit, then await confirmation.
    pub async fn run(
        &self,
        token: &mut Token,
        cancel: &CancellationToken,
    ) -> Result<TransitionOutcome, PipelineError> {
        if let Some(outcome) = self.submit(token).await? {
            return Ok(outcome);
        }
        self.await_confirmation(token, cancel).await
    }

    /// Run every token's pending transition concurrently.
    pub async fn run_all(
        &self,
        tokens: &mut [Token],
        cancel: &CancellationToken,
    ) -> Vec<Result<TransitionOutcome, PipelineError>> {
        join_all(tokens.iter_mut().map(|token| self.run(token, cancel))).await
    }
}
