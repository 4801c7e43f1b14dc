use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustBaseError {
    #[error("trust base has no validators")]
    NoValidators,
    #[error("quorum threshold must be at least 1")]
    ZeroThreshold,
    #[error("quorum threshold {threshold} exceeds validator count {validators}")]
    ThresholdTooHigh { threshold: usize, validators: usize },
    #[error("validator key {0} registered more than once")]
    DuplicateKey(PublicKey),
}

/// Validator identities and the quorum rule a certificate must satisfy.
///
/// Supplied out of band and passed explicitly to whoever validates proofs;
/// never derived from the proof being validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TrustBaseDocument", into = "TrustBaseDocument")]
pub struct TrustBase {
    network_id: u32,
    validators: BTreeMap<String, PublicKey>,
    quorum_threshold: usize,
}

/// On-disk form of a trust base, validated on conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrustBaseDocument {
    pub network_id: u32,
    pub validators: BTreeMap<String, PublicKey>,
    pub quorum_threshold: usize,
}

impl TrustBase {
    pub fn new(
        network_id: u32,
        validators: BTreeMap<String, PublicKey>,
        quorum_threshold: usize,
    ) -> Result<Self, TrustBaseError> {
        if validators.is_empty() {
            return Err(TrustBaseError::NoValidators);
        }
        if quorum_threshold == 0 {
            return Err(TrustBaseError::ZeroThreshold);
        }
        if quorum_threshold > validators.len() {
            return Err(TrustBaseError::ThresholdTooHigh {
                threshold: quorum_threshold,
                validators: validators.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for key in validators.values() {
            if !seen.insert(*key) {
                return Err(TrustBaseError::DuplicateKey(*key));
            }
        }
        Ok(Self {
            network_id,
            validators,
            quorum_threshold,
        })
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn quorum_threshold(&self) -> usize {
        self.quorum_threshold
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    pub fn validators(&self) -> impl Iterator<Item = (&str, &PublicKey)> {
        self.validators.iter().map(|(id, key)| (id.as_str(), key))
    }

    pub fn is_validator(&self, key: &PublicKey) -> bool {
        self.validators.values().any(|k| k == key)
    }
}

impl TryFrom<TrustBaseDocument> for TrustBase {
    type Error = TrustBaseError;

    fn try_from(doc: TrustBaseDocument) -> Result<Self, Self::Error> {
        TrustBase::new(doc.network_id, doc.validators, doc.quorum_threshold)
    }
}

impl From<TrustBase> for TrustBaseDocument {
    fn from(tb: TrustBase) -> Self {
        Self {
            network_id: tb.network_id,
            validators: tb.validators,
            quorum_threshold: tb.quorum_threshold,
        }
    }
}
