use serde::{Deserialize, Serialize};

use crate::commitment::RequestId;
use crate::hash::DataHash;
use crate::keys::PublicKey;
use crate::merkle::PathDefect;
use crate::proof::ProofField;

/// The four failure classes every error in the workspace maps onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Transport or server hiccup; retried up to a bound.
    Transient,
    /// Proof not produced yet, or produced incomplete; retried until the deadline.
    NotYetIncluded,
    /// The network's answer does not prove the transition; never retried.
    Invalid,
    /// Local setup is wrong (keys, trust base, ownership); never retried.
    Configuration,
}

/// Outcome of the full cryptographic check against the trust base.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationStatus {
    Ok,
    /// Folding the path does not reproduce the claimed root.
    PathRootMismatch {
        claimed: DataHash,
        computed: DataHash,
    },
    /// The certificate certifies some other root.
    CertificateRootMismatch {
        path_root: DataHash,
        certified_root: DataHash,
    },
    /// The certificate was issued for another network.
    NetworkMismatch { expected: u32, actual: u32 },
    /// Not enough distinct trust-base validators signed the root.
    InsufficientQuorum { valid: usize, required: usize },
}

impl VerificationStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationStatus::Ok)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFault {
    /// The authenticator names a signer outside the trust base.
    UnknownSigner,
    /// The signature does not verify over the transaction hash.
    InvalidSignature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    MissingField(ProofField),
}

/// Why a proof was rejected. Each variant corresponds to one validation step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    RequestIdMismatch {
        expected: RequestId,
        actual: RequestId,
    },
    StateBindingMismatch {
        expected: DataHash,
        actual: DataHash,
    },
    BadSignature {
        signer: PublicKey,
        fault: SignatureFault,
    },
    MalformedPath {
        defect: PathDefect,
    },
    VerificationFailed {
        status: VerificationStatus,
    },
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::RequestIdMismatch { .. } => "request_id_mismatch",
            RejectReason::StateBindingMismatch { .. } => "state_binding_mismatch",
            RejectReason::BadSignature { .. } => "bad_signature",
            RejectReason::MalformedPath { .. } => "malformed_path",
            RejectReason::VerificationFailed { .. } => "verification_failed",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::RequestIdMismatch { expected, actual } => {
                write!(f, "request id mismatch: queried {expected}, proof binds {actual}")
            }
            RejectReason::StateBindingMismatch { expected, actual } => {
                write!(f, "state binding mismatch: expected {expected}, proof binds {actual}")
            }
            RejectReason::BadSignature { signer, fault } => {
                write!(f, "bad authenticator signature from {signer}: {fault:?}")
            }
            RejectReason::MalformedPath { defect } => write!(f, "malformed merkle path: {defect}"),
            RejectReason::VerificationFailed { status } => {
                write!(f, "verification failed: {status:?}")
            }
        }
    }
}

/// The single authoritative classification of a proof.
///
/// There is no warnings channel: a proof is either confirmed, not finished
/// yet, or rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Confirmed,
    Incomplete(IncompleteReason),
    Rejected(RejectReason),
}

impl ValidationVerdict {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ValidationVerdict::Confirmed)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationVerdict::Rejected(_))
    }

    /// Error class of a non-confirmed verdict.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            ValidationVerdict::Confirmed => None,
            ValidationVerdict::Incomplete(_) => Some(ErrorClass::NotYetIncluded),
            ValidationVerdict::Rejected(_) => Some(ErrorClass::Invalid),
        }
    }
}
