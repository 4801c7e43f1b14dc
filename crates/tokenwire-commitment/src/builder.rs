use tokenwire_crypto::{Signer, Verifier};
use tokenwire_types::{
    Bytes, Commitment, DataHash, PredicateParams, Salt, TokenId,
};
use tracing::debug;

use crate::error::CommitmentError;
use crate::state::{genesis_state, transition_state_hash};

/// Confirmed state a transfer leaves, with the predicate that owns it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriorState {
    pub state_hash: DataHash,
    pub owner: PredicateParams,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Source {
    Genesis,
    Prior(PriorState),
}

/// Builds the commitment for one state transition.
///
/// Pure and deterministic: identical inputs and signer always yield an
/// identical commitment, so a build can be replayed and compared.
#[derive(Clone, Debug)]
pub struct CommitmentBuilder {
    token_id: TokenId,
    source: Source,
    recipient: PredicateParams,
    salt: Salt,
    message: Bytes,
}

impl CommitmentBuilder {
    /// Transition out of the genesis state of a new token.
    pub fn mint(token_id: TokenId, recipient: PredicateParams) -> Self {
        Self {
            token_id,
            source: Source::Genesis,
            recipient,
            salt: Salt::random(),
            message: Bytes::default(),
        }
    }

    /// Transition out of a confirmed prior state.
    pub fn transfer(token_id: TokenId, prior: PriorState, recipient: PredicateParams) -> Self {
        Self {
            token_id,
            source: Source::Prior(prior),
            recipient,
            salt: Salt::random(),
            message: Bytes::default(),
        }
    }

    pub fn salt(mut self, salt: Salt) -> Self {
        self.salt = salt;
        self
    }

    pub fn message(mut self, message: impl Into<Bytes>) -> Self {
        self.message = message.into();
        self
    }

    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    pub fn recipient(&self) -> &PredicateParams {
        &self.recipient
    }

    pub fn salt_value(&self) -> &Salt {
        &self.salt
    }

    pub fn message_value(&self) -> &Bytes {
        &self.message
    }

    pub fn source_state(&self) -> DataHash {
        match &self.source {
            Source::Genesis => genesis_state(&self.token_id),
            Source::Prior(prior) => prior.state_hash,
        }
    }

    pub fn state_hash(&self) -> DataHash {
        transition_state_hash(
            &self.token_id,
            &self.source_state(),
            &self.recipient,
            &self.salt,
            &self.message,
        )
    }

    /// Sign the state hash and assemble the commitment.
    pub fn build(&self, signer: &dyn Signer) -> Result<Commitment, CommitmentError> {
        self.recipient.validate()?;
        let public_key = signer.public_key();
        if let Source::Prior(prior) = &self.source {
            if !prior.owner.is_owned_by(&public_key) {
                return Err(CommitmentError::NotOwner {
                    owner: prior.owner.public_key,
                    signer: public_key,
                });
            }
        }

        let state_hash = self.state_hash();
        let signature = signer.sign(&state_hash)?;
        let commitment = Commitment::new(public_key, state_hash, signature);

        debug!(
            token_id = %self.token_id,
            request_id = %commitment.request_id(),
            mint = matches!(self.source, Source::Genesis),
            "Commitment built"
        );
        Ok(commitment)
    }

    /// Like [`CommitmentBuilder::build`], but also checks that the signer
    /// really signed the state hash under its advertised key.
    pub fn build_checked(
        &self,
        signer: &dyn Signer,
        verifier: &dyn Verifier,
    ) -> Result<Commitment, CommitmentError> {
        let commitment = self.build(signer)?;
        if !verifier.verify(
            commitment.public_key(),
            commitment.state_hash(),
            commitment.signature().as_bytes(),
        ) {
            return Err(CommitmentError::SignatureMismatch {
                public_key: *commitment.public_key(),
            });
        }
        Ok(commitment)
    }
}
