use serde::{Deserialize, Serialize};

use crate::hash::{fixed_bytes, DataHash, DomainHasher};
use crate::keys::{ClientSignature, PublicKey};

const REQUEST_ID_DOMAIN: &str = "tokenwire/request-id";
const TRANSACTION_DOMAIN: &str = "tokenwire/transaction";

fixed_bytes!(
    /// Key of a commitment in the aggregator's tree.
    ///
    /// Always `H(public_key || state_hash)`, so it can be recomputed from the
    /// commitment itself and is never merely trusted.
    RequestId,
    32
);

impl RequestId {
    pub fn derive(public_key: &PublicKey, state_hash: &DataHash) -> Self {
        let digest = DomainHasher::new(REQUEST_ID_DOMAIN)
            .update(public_key.as_bytes())
            .update(state_hash.as_bytes())
            .finalize();
        Self::from_bytes(*digest.as_bytes())
    }

    /// Bit `depth` of the key, MSB-first. Selects the branch at that depth
    /// of the sparse Merkle tree (`true` = right).
    pub fn bit(&self, depth: usize) -> bool {
        let byte = self.as_bytes()[depth / 8];
        (byte >> (7 - depth % 8)) & 1 == 1
    }
}

/// A signed request for the network to accept one state transition.
///
/// Fields are private: a commitment is immutable once built. Values read
/// from the outside world (envelopes, files) must be checked with
/// [`Commitment::verify_request_id`] before use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    request_id: RequestId,
    state_hash: DataHash,
    signature: ClientSignature,
    public_key: PublicKey,
}

impl Commitment {
    /// Assemble a commitment, deriving its request id.
    pub fn new(public_key: PublicKey, state_hash: DataHash, signature: ClientSignature) -> Self {
        Self {
            request_id: RequestId::derive(&public_key, &state_hash),
            state_hash,
            signature,
            public_key,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn state_hash(&self) -> &DataHash {
        &self.state_hash
    }

    pub fn signature(&self) -> &ClientSignature {
        &self.signature
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Recompute the request id from `public_key` and `state_hash`.
    pub fn verify_request_id(&self) -> bool {
        RequestId::derive(&self.public_key, &self.state_hash) == self.request_id
    }

    /// Hash of the transaction the network authenticator signs once the
    /// commitment is included.
    pub fn transaction_hash(&self) -> DataHash {
        DomainHasher::new(TRANSACTION_DOMAIN)
            .update(self.request_id.as_bytes())
            .update(self.state_hash.as_bytes())
            .update(self.signature.as_bytes())
            .finalize()
    }
}
