//! Token lifecycle.
//!
//! A token only ever moves forward through a validated transition. Every
//! other outcome (incomplete proof, rejection, timeout) leaves the last
//! confirmed state and owner untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokenwire_commitment::{genesis_state, transition_state_hash, PriorState};
use tokenwire_crypto::Verifier;
use tokenwire_proof::{ProofValidator, ValidationContext};
use tokenwire_types::{
    Bytes, Commitment, DataHash, ErrorClass, InclusionProof, PredicateParams, PublicKey,
    RejectReason, RequestId, Salt, TokenId, ValidationVerdict,
};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Draft,
    Submitted,
    AwaitingProof,
    Confirmed,
    Rejected,
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenStatus::Draft => "draft",
            TokenStatus::Submitted => "submitted",
            TokenStatus::AwaitingProof => "awaiting_proof",
            TokenStatus::Confirmed => "confirmed",
            TokenStatus::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// One confirmed transition, with the proof that justified it.
///
/// `salt` and `message` are kept so `state_hash` can be recomputed from the
/// previous entry and `predicate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHistoryEntry {
    pub request_id: RequestId,
    pub state_hash: DataHash,
    pub predicate: PredicateParams,
    pub salt: Salt,
    #[serde(default)]
    pub message: Bytes,
    pub proof: InclusionProof,
    pub timestamp: DateTime<Utc>,
}

/// A transition that has been built but not yet confirmed or rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransition {
    pub commitment: Commitment,
    pub recipient: PredicateParams,
    pub salt: Salt,
    #[serde(default)]
    pub message: Bytes,
}

/// Why a transition ended without confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum RejectionCause {
    /// The validator rejected the proof.
    Verdict { reason: RejectReason },
    /// The aggregator refused the commitment.
    Refused { status: String },
    /// No complete proof before the deadline.
    Timeout { attempts: u32 },
    /// Polling gave up on aggregator errors.
    Fatal { error: String, class: ErrorClass },
    Cancelled,
}

impl RejectionCause {
    pub fn class(&self) -> ErrorClass {
        match self {
            RejectionCause::Verdict { .. } | RejectionCause::Refused { .. } => ErrorClass::Invalid,
            RejectionCause::Timeout { .. } | RejectionCause::Cancelled => {
                ErrorClass::NotYetIncluded
            }
            RejectionCause::Fatal { class, .. } => *class,
        }
    }
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionCause::Verdict { reason } => write!(f, "[{}] {reason}", reason.code()),
            RejectionCause::Refused { status } => write!(f, "aggregator refused commitment: {status}"),
            RejectionCause::Timeout { attempts } => {
                write!(f, "no complete proof after {attempts} queries")
            }
            RejectionCause::Fatal { error, .. } => write!(f, "aggregator unavailable: {error}"),
            RejectionCause::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedTransition {
    pub request_id: RequestId,
    pub cause: RejectionCause,
    pub timestamp: DateTime<Utc>,
}

/// Why a confirmed history does not hold together.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryFault {
    #[error("proof does not validate ({0:?})")]
    Proof(ValidationVerdict),

    #[error("state hash {claimed} does not follow from the previous state ({derived})")]
    StateHash { claimed: DataHash, derived: DataHash },

    #[error("signed by {signer}, not by the previous owner {owner}")]
    NotPreviousOwner { owner: PublicKey, signer: PublicKey },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenStateError {
    #[error("token is not owned (status {status}, {confirmed} confirmed transitions)")]
    NotOwned { status: TokenStatus, confirmed: usize },

    #[error("cannot {action} a token in status {status}")]
    InvalidTransition {
        status: TokenStatus,
        action: &'static str,
    },

    #[error("signer {signer} does not satisfy the owner predicate ({owner})")]
    WrongSigner { owner: PublicKey, signer: PublicKey },

    #[error("commitment {0} is already in the token history")]
    AlreadyConfirmed(RequestId),

    #[error("commitment {0} was rejected and may not be resubmitted")]
    PreviouslyRejected(RequestId),

    #[error("commitment does not extend the current state: expected {expected}, built {actual}")]
    StateMismatch { expected: DataHash, actual: DataHash },

    #[error("token has no pending transition")]
    NoPendingTransition,

    #[error("token history is empty")]
    EmptyHistory,

    #[error("history entry {index} is invalid: {fault}")]
    BrokenHistory { index: usize, fault: HistoryFault },
}

impl TokenStateError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TokenStateError::BrokenHistory { .. } => ErrorClass::Invalid,
            _ => ErrorClass::Configuration,
        }
    }
}

/// Check that `history` is an unbroken chain from the genesis state of `id`.
///
/// Every proof must validate for its entry, every state hash must follow
/// from the previous state and the entry's own predicate, salt and message,
/// and every transition after the mint must be authenticated for a key that
/// satisfies the previous owner predicate.
pub fn verify_history<V: Verifier>(
    id: &TokenId,
    history: &[TokenHistoryEntry],
    validator: &ProofValidator<V>,
) -> Result<(), TokenStateError> {
    let mut state = genesis_state(id);
    let mut owner: Option<&PredicateParams> = None;

    for (index, entry) in history.iter().enumerate() {
        let broken = |fault: HistoryFault| TokenStateError::BrokenHistory { index, fault };

        let context = ValidationContext {
            request_id: entry.request_id,
            expected_state_hash: Some(entry.state_hash),
        };
        let verdict = validator.validate(&entry.proof, &context);
        if !verdict.is_confirmed() {
            return Err(broken(HistoryFault::Proof(verdict)));
        }

        let derived = transition_state_hash(id, &state, &entry.predicate, &entry.salt, &entry.message);
        if derived != entry.state_hash {
            return Err(broken(HistoryFault::StateHash {
                claimed: entry.state_hash,
                derived,
            }));
        }

        if let (Some(owner), Some(authenticator)) = (owner, entry.proof.authenticator.as_ref()) {
            if !owner.is_owned_by(&authenticator.public_key) {
                return Err(broken(HistoryFault::NotPreviousOwner {
                    owner: owner.public_key,
                    signer: authenticator.public_key,
                }));
            }
        }

        state = entry.state_hash;
        owner = Some(&entry.predicate);
    }
    Ok(())
}

/// A token and everything known about its transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    id: TokenId,
    current_state: DataHash,
    predicate: Option<PredicateParams>,
    history: Vec<TokenHistoryEntry>,
    status: TokenStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending: Option<PendingTransition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rejected: Vec<RejectedTransition>,
}

impl Token {
    /// A token about to be minted through `mint`.
    pub fn new_mint(id: TokenId, mint: PendingTransition) -> Result<Self, TokenStateError> {
        let mut token = Self {
            id,
            current_state: genesis_state(&id),
            predicate: None,
            history: Vec::new(),
            status: TokenStatus::Draft,
            pending: None,
            rejected: Vec::new(),
        };
        token.check_extends_current(&mint)?;
        token.pending = Some(mint);
        Ok(token)
    }

    /// A token rebuilt from confirmed history (e.g. received in an envelope).
    /// The whole chain is checked with [`verify_history`] first.
    pub fn from_history<V: Verifier>(
        id: TokenId,
        history: Vec<TokenHistoryEntry>,
        validator: &ProofValidator<V>,
    ) -> Result<Self, TokenStateError> {
        let last = history.last().ok_or(TokenStateError::EmptyHistory)?;
        verify_history(&id, &history, validator)?;
        Ok(Self {
            id,
            current_state: last.state_hash,
            predicate: Some(last.predicate.clone()),
            status: TokenStatus::Confirmed,
            history,
            pending: None,
            rejected: Vec::new(),
        })
    }

    pub fn id(&self) -> &TokenId {
        &self.id
    }

    pub fn current_state(&self) -> &DataHash {
        &self.current_state
    }

    /// Predicate of the current owner; `None` until the mint is confirmed.
    pub fn predicate(&self) -> Option<&PredicateParams> {
        self.predicate.as_ref()
    }

    pub fn history(&self) -> &[TokenHistoryEntry] {
        &self.history
    }

    pub fn status(&self) -> TokenStatus {
        self.status
    }

    pub fn pending(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    /// Every transition that ended without confirmation, oldest first.
    pub fn rejected(&self) -> &[RejectedTransition] {
        &self.rejected
    }

    pub fn last_rejected(&self) -> Option<&RejectedTransition> {
        self.rejected.last()
    }

    /// Whether `request_id` was rejected at any point.
    pub fn was_rejected(&self, request_id: &RequestId) -> bool {
        self.rejected.iter().any(|rejected| &rejected.request_id == request_id)
    }

    /// A token is owned once at least one transition was confirmed and no
    /// other transition is in flight.
    pub fn is_owned(&self) -> bool {
        !self.history.is_empty()
            && matches!(self.status, TokenStatus::Confirmed | TokenStatus::Rejected)
    }

    /// The confirmed state a transfer out of this token would leave.
    pub fn prior_state(&self) -> Result<PriorState, TokenStateError> {
        match (&self.predicate, self.is_owned()) {
            (Some(owner), true) => Ok(PriorState {
                state_hash: self.current_state,
                owner: owner.clone(),
            }),
            _ => Err(self.not_owned()),
        }
    }

    /// Start a new transition out of the current confirmed state.
    pub fn begin_transition(&mut self, transition: PendingTransition) -> Result<(), TokenStateError> {
        if !self.is_owned() {
            return Err(self.not_owned());
        }
        let id = *transition.commitment.request_id();
        if self.is_confirmed(&id) {
            return Err(TokenStateError::AlreadyConfirmed(id));
        }
        if self.was_rejected(&id) {
            return Err(TokenStateError::PreviouslyRejected(id));
        }
        if let Some(owner) = &self.predicate {
            let signer = transition.commitment.public_key();
            if !owner.is_owned_by(signer) {
                return Err(TokenStateError::WrongSigner {
                    owner: owner.public_key,
                    signer: *signer,
                });
            }
        }
        self.check_extends_current(&transition)?;

        debug!(token_id = %self.id, request_id = %id, "Transition started");
        self.pending = Some(transition);
        self.status = TokenStatus::Draft;
        Ok(())
    }

    /// Draft -> Submitted, once the aggregator accepted the commitment.
    pub fn mark_submitted(&mut self) -> Result<(), TokenStateError> {
        self.advance(TokenStatus::Draft, TokenStatus::Submitted, "submit")
    }

    /// Submitted -> AwaitingProof, when polling begins.
    pub fn mark_awaiting_proof(&mut self) -> Result<(), TokenStateError> {
        self.advance(TokenStatus::Submitted, TokenStatus::AwaitingProof, "await a proof for")
    }

    /// Validate `proof` for the pending transition and apply the verdict.
    ///
    /// `Confirmed` appends a history entry and moves the token to the new
    /// owner. `Rejected` ends the transition with the prior state intact.
    /// `Incomplete` changes nothing. A proof for a transition already in
    /// history is validated against that entry and changes nothing either.
    pub fn settle<V: Verifier>(
        &mut self,
        proof: InclusionProof,
        validator: &ProofValidator<V>,
        now: DateTime<Utc>,
    ) -> Result<ValidationVerdict, TokenStateError> {
        let Some(pending) = self.pending.as_ref() else {
            return self.revalidate(&proof, validator);
        };
        if self.status != TokenStatus::AwaitingProof {
            return Err(TokenStateError::InvalidTransition {
                status: self.status,
                action: "settle",
            });
        }

        let verdict = validator.validate(&proof, &ValidationContext::for_commitment(&pending.commitment));
        match &verdict {
            ValidationVerdict::Confirmed => self.confirm(proof, now),
            ValidationVerdict::Rejected(reason) => self.reject(
                RejectionCause::Verdict {
                    reason: reason.clone(),
                },
                now,
            )?,
            ValidationVerdict::Incomplete(_) => {}
        }
        Ok(verdict)
    }

    /// End the pending transition without confirmation.
    pub fn reject(&mut self, cause: RejectionCause, now: DateTime<Utc>) -> Result<(), TokenStateError> {
        if !matches!(
            self.status,
            TokenStatus::Draft | TokenStatus::Submitted | TokenStatus::AwaitingProof
        ) {
            return Err(TokenStateError::InvalidTransition {
                status: self.status,
                action: "reject",
            });
        }
        let pending = self
            .pending
            .take()
            .ok_or(TokenStateError::NoPendingTransition)?;
        let request_id = *pending.commitment.request_id();
        warn!(token_id = %self.id, request_id = %request_id, %cause, "Transition rejected");

        self.status = TokenStatus::Rejected;
        self.rejected.push(RejectedTransition {
            request_id,
            cause,
            timestamp: now,
        });
        Ok(())
    }

    /// Whether `request_id` is already part of the confirmed history.
    pub fn is_confirmed(&self, request_id: &RequestId) -> bool {
        self.history.iter().any(|entry| &entry.request_id == request_id)
    }

    fn revalidate<V: Verifier>(
        &self,
        proof: &InclusionProof,
        validator: &ProofValidator<V>,
    ) -> Result<ValidationVerdict, TokenStateError> {
        let entry = proof
            .authenticator
            .as_ref()
            .map(|auth| RequestId::derive(&auth.public_key, &auth.state_hash))
            .and_then(|request_id| self.history.iter().find(|entry| entry.request_id == request_id))
            .ok_or(TokenStateError::NoPendingTransition)?;

        let context = ValidationContext {
            request_id: entry.request_id,
            expected_state_hash: Some(entry.state_hash),
        };
        let verdict = validator.validate(proof, &context);
        debug!(token_id = %self.id, request_id = %entry.request_id, ?verdict, "Proof for a confirmed transition");
        Ok(verdict)
    }

    fn confirm(&mut self, proof: InclusionProof, now: DateTime<Utc>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let request_id = *pending.commitment.request_id();
        self.status = TokenStatus::Confirmed;
        self.current_state = *pending.commitment.state_hash();
        self.predicate = Some(pending.recipient.clone());
        self.history.push(TokenHistoryEntry {
            request_id,
            state_hash: *pending.commitment.state_hash(),
            predicate: pending.recipient,
            salt: pending.salt,
            message: pending.message,
            proof,
            timestamp: now,
        });
        info!(
            token_id = %self.id,
            request_id = %request_id,
            transitions = self.history.len(),
            "Transition confirmed"
        );
    }

    fn check_extends_current(&self, transition: &PendingTransition) -> Result<(), TokenStateError> {
        let expected = transition_state_hash(
            &self.id,
            &self.current_state,
            &transition.recipient,
            &transition.salt,
            &transition.message,
        );
        let actual = *transition.commitment.state_hash();
        if expected != actual || !transition.commitment.verify_request_id() {
            return Err(TokenStateError::StateMismatch { expected, actual });
        }
        Ok(())
    }

    fn advance(
        &mut self,
        from: TokenStatus,
        to: TokenStatus,
        action: &'static str,
    ) -> Result<(), TokenStateError> {
        if self.status != from || self.pending.is_none() {
            return Err(TokenStateError::InvalidTransition {
                status: self.status,
                action,
            });
        }
        self.status = to;
        Ok(())
    }

    fn not_owned(&self) -> TokenStateError {
        TokenStateError::NotOwned {
            status: self.status,
            confirmed: self.history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use tokenwire_aggregator::{SparseTree, TestNetwork};
    use tokenwire_commitment::CommitmentBuilder;
    use tokenwire_crypto::{Ed25519Signer, Signer};

    struct Fixture {
        network: TestNetwork,
        validator: ProofValidator,
        minter: Ed25519Signer,
    }

    impl Fixture {
        fn new() -> Self {
            let network = TestNetwork::new(1, 3, 2).unwrap();
            let validator = ProofValidator::new(network.trust_base().clone());
            Self {
                network,
                validator,
                minter: Ed25519Signer::from_secret_bytes(&[21; 32]),
            }
        }

        fn proof_for(&self, commitment: &Commitment) -> InclusionProof {
            let entries: BTreeMap<RequestId, DataHash> =
                [(*commitment.request_id(), commitment.transaction_hash())].into();
            let tree = SparseTree::build(&entries);
            InclusionProof {
                merkle_path: tree.path(commitment.request_id()),
                transaction_hash: Some(commitment.transaction_hash()),
                authenticator: self.network.authenticate(commitment),
                certificate: Some(self.network.certify(1, tree.root(), 3)),
            }
        }

        fn mint_transition(&self, id: TokenId) -> PendingTransition {
            let recipient = PredicateParams::unmasked(self.minter.public_key());
            let builder = CommitmentBuilder::mint(id, recipient.clone()).salt(Salt::from_bytes([1; 32]));
            PendingTransition {
                commitment: builder.build(&self.minter).unwrap(),
                recipient,
                salt: *builder.salt_value(),
                message: Bytes::default(),
            }
        }

        fn confirmed_token(&self) -> Token {
            let id = TokenId::from_bytes([8; 32]);
            let mut token = Token::new_mint(id, self.mint_transition(id)).unwrap();
            token.mark_submitted().unwrap();
            token.mark_awaiting_proof().unwrap();
            let proof = self.proof_for(&token.pending().unwrap().commitment);
            token.settle(proof, &self.validator, Utc::now()).unwrap();
            token
        }
    }

    fn transfer_to(token: &Token, signer: &Ed25519Signer, seed: u8) -> PendingTransition {
        let recipient = PredicateParams::unmasked(Ed25519Signer::from_secret_bytes(&[seed; 32]).public_key());
        let builder = CommitmentBuilder::transfer(*token.id(), token.prior_state().unwrap(), recipient.clone())
            .salt(Salt::from_bytes([seed; 32]));
        PendingTransition {
            commitment: builder.build(signer).unwrap(),
            recipient,
            salt: *builder.salt_value(),
            message: Bytes::default(),
        }
    }

    #[test]
    fn mint_confirms_through_lifecycle() {
        let fx = Fixture::new();
        let token = fx.confirmed_token();
        assert_eq!(token.status(), TokenStatus::Confirmed);
        assert_eq!(token.history().len(), 1);
        assert!(token.is_owned());
        assert!(token.predicate().unwrap().is_owned_by(&fx.minter.public_key()));
        assert_eq!(*token.current_state(), token.history()[0].state_hash);
    }

    #[test]
    fn rejected_proof_keeps_prior_state() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let before_state = *token.current_state();
        let before_owner = token.predicate().cloned();

        token.begin_transition(transfer_to(&token, &fx.minter, 40)).unwrap();
        token.mark_submitted().unwrap();
        token.mark_awaiting_proof().unwrap();
        let mut proof = fx.proof_for(&token.pending().unwrap().commitment);
        proof.certificate.as_mut().unwrap().signatures.truncate(1);

        let verdict = token.settle(proof, &fx.validator, Utc::now()).unwrap();
        assert!(verdict.is_rejected());
        assert_eq!(token.status(), TokenStatus::Rejected);
        assert_eq!(*token.current_state(), before_state);
        assert_eq!(token.predicate().cloned(), before_owner);
        assert_eq!(token.history().len(), 1);
        assert!(token.is_owned());
    }

    #[test]
    fn incomplete_proof_changes_nothing() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        token.begin_transition(transfer_to(&token, &fx.minter, 41)).unwrap();
        token.mark_submitted().unwrap();
        token.mark_awaiting_proof().unwrap();
        let snapshot = token.clone();

        let mut proof = fx.proof_for(&token.pending().unwrap().commitment);
        proof.authenticator = None;
        let verdict = token.settle(proof, &fx.validator, Utc::now()).unwrap();
        assert!(matches!(verdict, ValidationVerdict::Incomplete(_)));
        assert_eq!(token, snapshot);
    }

    #[test]
    fn rejected_commitment_cannot_be_resubmitted() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let transition = transfer_to(&token, &fx.minter, 42);
        token.begin_transition(transition.clone()).unwrap();
        token
            .reject(RejectionCause::Timeout { attempts: 3 }, Utc::now())
            .unwrap();

        assert_eq!(
            token.begin_transition(transition.clone()),
            Err(TokenStateError::PreviouslyRejected(
                *transition.commitment.request_id()
            ))
        );
        assert!(token.begin_transition(transfer_to(&token, &fx.minter, 43)).is_ok());
    }

    #[test]
    fn every_rejected_commitment_stays_refused() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let first = transfer_to(&token, &fx.minter, 44);
        token.begin_transition(first.clone()).unwrap();
        token
            .reject(RejectionCause::Timeout { attempts: 3 }, Utc::now())
            .unwrap();
        let second = transfer_to(&token, &fx.minter, 45);
        token.begin_transition(second.clone()).unwrap();
        token.reject(RejectionCause::Cancelled, Utc::now()).unwrap();

        assert_eq!(token.rejected().len(), 2);
        assert_eq!(token.last_rejected().unwrap().cause, RejectionCause::Cancelled);
        for transition in [first, second] {
            assert_eq!(
                token.begin_transition(transition.clone()),
                Err(TokenStateError::PreviouslyRejected(
                    *transition.commitment.request_id()
                ))
            );
        }

        let json = serde_json::to_string(&token).unwrap();
        let reloaded: Token = serde_json::from_str(&json).unwrap();
        assert!(reloaded.was_rejected(&token.rejected()[0].request_id));
    }

    #[test]
    fn confirmed_commitment_cannot_be_replayed() {
        let fx = Fixture::new();
        let id = TokenId::from_bytes([8; 32]);
        let mut token = fx.confirmed_token();
        let replay = fx.mint_transition(id);
        assert!(matches!(
            token.begin_transition(replay),
            Err(TokenStateError::AlreadyConfirmed(_))
        ));
    }

    #[test]
    fn settling_a_known_confirmation_is_a_no_op() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let snapshot = token.clone();
        let proof = token.history()[0].proof.clone();
        assert_eq!(
            token.settle(proof, &fx.validator, Utc::now()),
            Ok(ValidationVerdict::Confirmed)
        );
        assert_eq!(token, snapshot);
    }

    #[test]
    fn stripped_proof_for_a_confirmed_transition_is_not_confirmed() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let snapshot = token.clone();
        let mut proof = token.history()[0].proof.clone();
        proof.transaction_hash = None;
        proof.merkle_path = None;
        proof.certificate = None;

        let verdict = token.settle(proof, &fx.validator, Utc::now()).unwrap();
        assert!(matches!(verdict, ValidationVerdict::Incomplete(_)));
        assert_eq!(token, snapshot);
    }

    #[test]
    fn history_rebuilds_the_confirmed_token() {
        let fx = Fixture::new();
        let token = fx.confirmed_token();
        let rebuilt = Token::from_history(*token.id(), token.history().to_vec(), &fx.validator).unwrap();
        assert_eq!(rebuilt.current_state(), token.current_state());
        assert_eq!(rebuilt.predicate(), token.predicate());
        assert!(rebuilt.is_owned());
    }

    #[test]
    fn rewritten_owner_breaks_the_history() {
        let fx = Fixture::new();
        let token = fx.confirmed_token();
        let mut history = token.history().to_vec();
        let mallory = Ed25519Signer::from_secret_bytes(&[66; 32]).public_key();
        history[0].predicate = PredicateParams::unmasked(mallory);

        let err = Token::from_history(*token.id(), history, &fx.validator).unwrap_err();
        assert!(matches!(
            err,
            TokenStateError::BrokenHistory {
                index: 0,
                fault: HistoryFault::StateHash { .. }
            }
        ));
        assert_eq!(err.class(), ErrorClass::Invalid);
    }

    #[test]
    fn transfer_not_signed_by_previous_owner_breaks_the_history() {
        let fx = Fixture::new();
        let token = fx.confirmed_token();
        let mallory = Ed25519Signer::from_secret_bytes(&[67; 32]);

        // Mallory signs a well-formed transition out of Alice's state; the
        // network includes whatever it is given.
        let recipient = PredicateParams::unmasked(mallory.public_key());
        let salt = Salt::from_bytes([68; 32]);
        let state = transition_state_hash(token.id(), token.current_state(), &recipient, &salt, &Bytes::default());
        let commitment = Commitment::new(mallory.public_key(), state, mallory.sign(&state).unwrap());
        let mut history = token.history().to_vec();
        history.push(TokenHistoryEntry {
            request_id: *commitment.request_id(),
            state_hash: state,
            predicate: recipient,
            salt,
            message: Bytes::default(),
            proof: fx.proof_for(&commitment),
            timestamp: Utc::now(),
        });

        let err = Token::from_history(*token.id(), history, &fx.validator).unwrap_err();
        assert!(matches!(
            err,
            TokenStateError::BrokenHistory {
                index: 1,
                fault: HistoryFault::NotPreviousOwner { .. }
            }
        ));
        assert_eq!(
            Token::from_history(*token.id(), Vec::new(), &fx.validator),
            Err(TokenStateError::EmptyHistory)
        );
    }

    #[test]
    fn only_the_owner_may_start_a_transition() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let stranger = Ed25519Signer::from_secret_bytes(&[99; 32]);
        let recipient = PredicateParams::unmasked(stranger.public_key());
        let salt = Salt::from_bytes([5; 32]);
        let state = transition_state_hash(token.id(), token.current_state(), &recipient, &salt, &Bytes::default());
        let commitment = Commitment::new(stranger.public_key(), state, stranger.sign(&state).unwrap());
        let transition = PendingTransition {
            commitment,
            recipient,
            salt,
            message: Bytes::default(),
        };
        assert!(matches!(
            token.begin_transition(transition),
            Err(TokenStateError::WrongSigner { .. })
        ));
    }

    #[test]
    fn transition_must_extend_current_state() {
        let fx = Fixture::new();
        let mut token = fx.confirmed_token();
        let other = Fixture::new().mint_transition(TokenId::from_bytes([9; 32]));
        assert!(matches!(
            token.begin_transition(other),
            Err(TokenStateError::StateMismatch { .. })
        ));
    }

    #[test]
    fn draft_cannot_start_another_transition() {
        let fx = Fixture::new();
        let id = TokenId::from_bytes([3; 32]);
        let mut token = Token::new_mint(id, fx.mint_transition(id)).unwrap();
        assert!(!token.is_owned());
        assert!(matches!(token.prior_state(), Err(TokenStateError::NotOwned { .. })));
        assert!(matches!(
            token.mark_awaiting_proof(),
            Err(TokenStateError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn rejected_mint_is_not_owned() {
        let fx = Fixture::new();
        let id = TokenId::from_bytes([4; 32]);
        let mut token = Token::new_mint(id, fx.mint_transition(id)).unwrap();
        token
            .reject(
                RejectionCause::Refused {
                    status: "SIGNATURE_VERIFICATION_FAILED".into(),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(token.status(), TokenStatus::Rejected);
        assert!(!token.is_owned());
        assert!(token.predicate().is_none());
        assert_eq!(token.last_rejected().unwrap().cause.class(), ErrorClass::Invalid);
        assert_eq!(token.rejected().len(), 1);
    }

    #[test]
    fn token_json_roundtrip() {
        let fx = Fixture::new();
        let token = fx.confirmed_token();
        let json = serde_json::to_string(&token).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["status"], "confirmed");
        assert!(value.get("pending").is_none());
    }
}
