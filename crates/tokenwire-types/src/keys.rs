//! Public keys and the two non-interchangeable signature kinds.
//!
//! A [`ClientSignature`] is produced by the owner of a token over a commitment's
//! state hash. A [`NetworkSignature`] is produced by the aggregation network's
//! consensus identity. The two are separate types with no conversion between
//! them, so a client signature can never be placed where a network
//! authenticator is expected.

use crate::hash::fixed_bytes;

fixed_bytes!(
    /// Ed25519 public key (32 bytes).
    PublicKey,
    32
);

fixed_bytes!(
    /// Signature made by the client over a commitment's state hash.
    ClientSignature,
    64
);

fixed_bytes!(
    /// Signature made by a network (BFT consensus) identity.
    NetworkSignature,
    64
);
