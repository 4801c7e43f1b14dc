use tokenwire_types::{Bytes, DataHash, DomainHasher, PredicateParams, Salt, TokenId};

const GENESIS_DOMAIN: &str = "tokenwire/genesis";
const STATE_DOMAIN: &str = "tokenwire/state";

/// Source state of a token's mint transition.
pub fn genesis_state(token_id: &TokenId) -> DataHash {
    DomainHasher::new(GENESIS_DOMAIN)
        .update(token_id.as_bytes())
        .finalize()
}

/// State hash a transition commits to.
///
/// Binds the token, the state it leaves, the predicate it moves to, the
/// transition salt and the message digest. Recomputable by anyone holding
/// the transfer envelope.
pub fn transition_state_hash(
    token_id: &TokenId,
    source_state: &DataHash,
    recipient: &PredicateParams,
    salt: &Salt,
    message: &Bytes,
) -> DataHash {
    DomainHasher::new(STATE_DOMAIN)
        .update(token_id.as_bytes())
        .update(source_state.as_bytes())
        .update(recipient.hash().as_bytes())
        .update(salt.as_bytes())
        .update(DataHash::digest(message.as_slice()).as_bytes())
        .finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenwire_types::PublicKey;

    #[test]
    fn every_input_changes_the_state_hash() {
        let token = TokenId::from_bytes([1; 32]);
        let source = genesis_state(&token);
        let recipient = PredicateParams::unmasked(PublicKey::from_bytes([2; 32]));
        let salt = Salt::from_bytes([3; 32]);
        let message = Bytes::from("memo");
        let base = transition_state_hash(&token, &source, &recipient, &salt, &message);

        let other_token = TokenId::from_bytes([9; 32]);
        assert_ne!(
            base,
            transition_state_hash(&other_token, &source, &recipient, &salt, &message)
        );
        assert_ne!(
            base,
            transition_state_hash(&token, &DataHash::ZERO, &recipient, &salt, &message)
        );
        let other_recipient = PredicateParams::unmasked(PublicKey::from_bytes([4; 32]));
        assert_ne!(
            base,
            transition_state_hash(&token, &source, &other_recipient, &salt, &message)
        );
        assert_ne!(
            base,
            transition_state_hash(&token, &source, &recipient, &Salt::from_bytes([0; 32]), &message)
        );
        assert_ne!(
            base,
            transition_state_hash(&token, &source, &recipient, &salt, &Bytes::default())
        );
    }

    #[test]
    fn genesis_depends_on_token() {
        assert_ne!(
            genesis_state(&TokenId::from_bytes([1; 32])),
            genesis_state(&TokenId::from_bytes([2; 32]))
        );
    }
}
