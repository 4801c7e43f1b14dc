//! # tokenwire-types
//!
//! Data model shared by every tokenwire crate:
//!
//! - **Hashes and identifiers**: [`DataHash`] (BLAKE3), [`TokenId`], [`Salt`],
//!   [`RequestId`], all hex on the wire
//! - **Keys and signatures**: [`PublicKey`], [`ClientSignature`] and
//!   [`NetworkSignature`] as separate, non-convertible types
//! - **Commitments**: [`Commitment`] with an always-recomputable request id
//! - **Inclusion proofs**: [`InclusionProof`], its [`CompleteProof`] view,
//!   [`MerklePath`] folding and [`RootCertificate`]
//! - **Trust anchor**: [`TrustBase`]
//! - **Verdicts**: [`ValidationVerdict`], a single tagged outcome per proof

pub mod commitment;
pub mod hash;
pub mod keys;
pub mod merkle;
pub mod predicate;
pub mod proof;
pub mod trust_base;
pub mod verdict;

pub use commitment::{Commitment, RequestId};
pub use hash::{Bytes, DataHash, DomainHasher, HexError, Nonce, Salt, TokenId};
pub use keys::{ClientSignature, NetworkSignature, PublicKey};
pub use merkle::{MerklePath, MerkleStep, PathDefect, TREE_DEPTH};
pub use predicate::{PredicateError, PredicateKind, PredicateParams};
pub use proof::{
    Authenticator, CompleteProof, InclusionProof, ProofField, RootCertificate, ValidatorSignature,
};
pub use trust_base::{TrustBase, TrustBaseDocument, TrustBaseError};
pub use verdict::{
    ErrorClass, IncompleteReason, RejectReason, SignatureFault, ValidationVerdict,
    VerificationStatus,
};
