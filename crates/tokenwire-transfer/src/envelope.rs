//! Offline transfer envelope.
//!
//! The sender packs the pending transition and the token's confirmed
//! history into a versioned JSON document. The receiver, possibly much
//! later and without the sender online, checks it, re-validates every
//! proof it carries and finishes the pipeline on its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokenwire_aggregator::AggregatorClient;
use tokenwire_commitment::{genesis_state, transition_state_hash};
use tokenwire_crypto::Verifier;
use tokenwire_proof::{ProofValidator, ValidationContext};
use tokenwire_types::{
    Bytes, Commitment, DataHash, ErrorClass, InclusionProof, PredicateParams, PublicKey,
    RequestId, Salt, TokenId,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pipeline::{PipelineError, TransitionOutcome, TransitionPipeline};
use crate::token::{PendingTransition, Token, TokenHistoryEntry, TokenStateError, TokenStatus};

/// Envelope format version this build reads and writes.
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("unsupported envelope version {found} (supported: {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("commitment request id does not match its public key and state hash")]
    RequestIdMismatch { claimed: RequestId, derived: RequestId },

    #[error("commitment state hash {claimed} does not match envelope contents ({derived})")]
    StateHashMismatch { claimed: DataHash, derived: DataHash },

    #[error("envelope is addressed to {actual}, not {expected}")]
    WrongRecipient { expected: PublicKey, actual: PublicKey },

    #[error("token has no pending transition to send")]
    NothingToSend,

    #[error(transparent)]
    Token(#[from] TokenStateError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl EnvelopeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            EnvelopeError::UnsupportedVersion { .. }
            | EnvelopeError::Malformed(_)
            | EnvelopeError::WrongRecipient { .. }
            | EnvelopeError::NothingToSend => ErrorClass::Configuration,
            EnvelopeError::RequestIdMismatch { .. }
            | EnvelopeError::StateHashMismatch { .. } => ErrorClass::Invalid,
            EnvelopeError::Token(err) => err.class(),
            EnvelopeError::Pipeline(err) => err.class(),
        }
    }
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        EnvelopeError::Malformed(err.to_string())
    }
}

/// Everything a receiver needs to finish a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEnvelope {
    pub version: u32,
    pub token_id: TokenId,
    pub commitment: Commitment,
    pub recipient_predicate_params: PredicateParams,
    pub salt: Salt,
    #[serde(default)]
    pub message: Bytes,
    #[serde(default)]
    pub proof: Option<InclusionProof>,
    #[serde(default)]
    pub history: Vec<TokenHistoryEntry>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u64>,
}

impl TransferEnvelope {
    /// Pack `token`'s pending transition, with `proof` if the sender already has one.
    pub fn from_token(token: &Token, proof: Option<InclusionProof>) -> Result<Self, EnvelopeError> {
        let pending = token.pending().ok_or(EnvelopeError::NothingToSend)?;
        Ok(Self {
            version: ENVELOPE_VERSION,
            token_id: *token.id(),
            commitment: pending.commitment.clone(),
            recipient_predicate_params: pending.recipient.clone(),
            salt: pending.salt,
            message: pending.message.clone(),
            proof,
            history: token.history().to_vec(),
        })
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an envelope, refusing any version other than [`ENVELOPE_VERSION`].
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        let header: VersionHeader = serde_json::from_str(json)?;
        match header.version {
            Some(version) if version == u64::from(ENVELOPE_VERSION) => {}
            Some(found) => {
                return Err(EnvelopeError::UnsupportedVersion {
                    found,
                    supported: ENVELOPE_VERSION,
                })
            }
            None => return Err(EnvelopeError::Malformed("missing version".into())),
        }
        Ok(serde_json::from_str(json)?)
    }

    /// State the transition leaves: the last confirmed state, or genesis.
    pub fn source_state(&self) -> DataHash {
        self.history
            .last()
            .map(|entry| entry.state_hash)
            .unwrap_or_else(|| genesis_state(&self.token_id))
    }

    /// Recompute the commitment from the envelope's own contents and check
    /// it is addressed to `expected_recipient`, if given.
    pub fn check(&self, expected_recipient: Option<&PublicKey>) -> Result<(), EnvelopeError> {
        if self.version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion {
                found: u64::from(self.version),
                supported: ENVELOPE_VERSION,
            });
        }

        let derived = RequestId::derive(self.commitment.public_key(), self.commitment.state_hash());
        if &derived != self.commitment.request_id() {
            return Err(EnvelopeError::RequestIdMismatch {
                claimed: *self.commitment.request_id(),
                derived,
            });
        }

        let derived = transition_state_hash(
            &self.token_id,
            &self.source_state(),
            &self.recipient_predicate_params,
            &self.salt,
            &self.message,
        );
        if &derived != self.commitment.state_hash() {
            return Err(EnvelopeError::StateHashMismatch {
                claimed: *self.commitment.state_hash(),
                derived,
            });
        }

        if let Some(expected) = expected_recipient {
            let actual = &self.recipient_predicate_params.public_key;
            if actual != expected {
                return Err(EnvelopeError::WrongRecipient {
                    expected: *expected,
                    actual: *actual,
                });
            }
        }
        Ok(())
    }

    /// Rebuild the token with this envelope's transition pending. The carried
    /// history must form a valid chain under `validator`, and the pending
    /// commitment must be signed by its last owner.
    pub fn into_token<V: Verifier>(self, validator: &ProofValidator<V>) -> Result<Token, EnvelopeError> {
        let transition = PendingTransition {
            commitment: self.commitment,
            recipient: self.recipient_predicate_params,
            salt: self.salt,
            message: self.message,
        };
        let token = if self.history.is_empty() {
            Token::new_mint(self.token_id, transition)?
        } else {
            let mut token = Token::from_history(self.token_id, self.history, validator)?;
            token.begin_transition(transition)?;
            token
        };
        Ok(token)
    }
}

/// Finishes transfers from envelopes.
pub struct EnvelopeReceiver<'a, C: ?Sized, V = tokenwire_crypto::Ed25519Verifier> {
    pipeline: TransitionPipeline<'a, C, V>,
    expected_recipient: Option<PublicKey>,
}

impl<'a, C, V> EnvelopeReceiver<'a, C, V>
where
    C: AggregatorClient + ?Sized,
    V: Verifier,
{
    pub fn new(pipeline: TransitionPipeline<'a, C, V>) -> Self {
        Self {
            pipeline,
            expected_recipient: None,
        }
    }

    /// Refuse envelopes whose recipient predicate names another key.
    pub fn expect_recipient(mut self, key: PublicKey) -> Self {
        self.expected_recipient = Some(key);
        self
    }

    /// Check, re-validate and complete `envelope`.
    ///
    /// Returns the received token whatever the outcome; it only carries the
    /// new owner when the outcome is `Confirmed`.
    pub async fn receive(
        &self,
        envelope: TransferEnvelope,
        cancel: &CancellationToken,
    ) -> Result<(Token, TransitionOutcome), EnvelopeError> {
        envelope.check(self.expected_recipient.as_ref())?;

        let embedded = envelope.proof.clone();
        let mut token = envelope.into_token(self.pipeline.validator())?;
        let request_id = token
            .pending()
            .map(|pending| *pending.commitment.request_id())
            .ok_or(TokenStateError::NoPendingTransition)?;

        if let Some(proof) = embedded {
            let context = token
                .pending()
                .map(|pending| ValidationContext::for_commitment(&pending.commitment))
                .ok_or(TokenStateError::NoPendingTransition)?;
            // Only a confirming proof is taken from the sender. Anything else
            // is decided by what the network itself returns.
            let verdict = self.pipeline.validator().validate(&proof, &context);
            if verdict.is_confirmed() {
                debug!(request_id = %request_id, "Settling embedded proof");
                token.mark_submitted()?;
                token.mark_awaiting_proof()?;
                let outcome = self.pipeline.settle(&mut token, proof)?;
                return Ok((token, outcome));
            }
            info!(request_id = %request_id, ?verdict, "Embedded proof not usable, polling aggregator");
        }

        let outcome = self.pipeline.run(&mut token, cancel).await?;
        if token.status() == TokenStatus::Confirmed {
            info!(token_id = %token.id(), "Transfer received");
        }
        Ok((token, outcome))
    }
}
