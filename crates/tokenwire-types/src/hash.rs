use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Errors from parsing hex-encoded fixed-size values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    #[error("invalid hex length: {actual} (expected {expected})")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid hex character")]
    InvalidHex,
}

/// Declares a fixed-size byte value that serializes as lowercase hex.
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, $crate::hash::HexError> {
                if s.len() != $len * 2 {
                    return Err($crate::hash::HexError::InvalidLength {
                        expected: $len * 2,
                        actual: s.len(),
                    });
                }
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes)
                    .map_err(|_| $crate::hash::HexError::InvalidHex)?;
                Ok(Self(bytes))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_hex()[..12])
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::hash::HexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let hex = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::from_hex(&hex).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use fixed_bytes;

fixed_bytes!(
    /// BLAKE3 digest (32 bytes). Every hash in the protocol is one of these.
    DataHash,
    32
);

impl DataHash {
    /// Hash of an empty sparse-tree subtree.
    pub const ZERO: DataHash = DataHash([0u8; 32]);

    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

/// Incremental BLAKE3 hasher prefixed with a domain tag.
///
/// Every protocol hash goes through a distinct domain so that a value of
/// one kind can never be replayed as a value of another.
pub struct DomainHasher(blake3::Hasher);

impl DomainHasher {
    pub fn new(domain: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain.as_bytes());
        hasher.update(&[0u8]);
        Self(hasher)
    }

    pub fn update(mut self, bytes: &[u8]) -> Self {
        self.0.update(bytes);
        self
    }

    pub fn finalize(self) -> DataHash {
        DataHash(*self.0.finalize().as_bytes())
    }
}

fixed_bytes!(
    /// Identifier of a token, fixed at mint time.
    TokenId,
    32
);

impl TokenId {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

fixed_bytes!(
    /// Per-transition randomness mixed into the state hash.
    Salt,
    32
);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

fixed_bytes!(
    /// Masking nonce for masked predicates.
    Nonce,
    32
);

impl Nonce {
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// Opaque free-form bytes (transfer messages), hex on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Bytes {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s)
            .map(Bytes)
            .map_err(|_| serde::de::Error::custom(HexError::InvalidHex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(DataHash::digest(b"abc"), DataHash::digest(b"abc"));
        assert_ne!(DataHash::digest(b"abc"), DataHash::digest(b"abd"));
    }

    #[test]
    fn domains_separate_equal_payloads() {
        let a = DomainHasher::new("a").update(b"payload").finalize();
        let b = DomainHasher::new("b").update(b"payload").finalize();
        assert_ne!(a, b);
    }

    #[test]
    fn hex_roundtrip_and_errors() {
        let h = DataHash::digest(b"x");
        assert_eq!(DataHash::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(
            DataHash::from_hex("abcd"),
            Err(HexError::InvalidLength {
                expected: 64,
                actual: 4
            })
        );
        assert_eq!(DataHash::from_hex(&"zz".repeat(32)), Err(HexError::InvalidHex));
    }

    #[test]
    fn serializes_as_hex_string() {
        let h = DataHash::digest(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: DataHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn debug_is_abbreviated() {
        let dbg = format!("{:?}", DataHash::ZERO);
        assert_eq!(dbg, "DataHash(000000000000)");
    }

    #[test]
    fn bytes_serde() {
        let b = Bytes::from("hello");
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"68656c6c6f\"");
        assert_eq!(serde_json::from_str::<Bytes>(&json).unwrap(), b);
    }
}
