//! # tokenwire-commitment
//!
//! Turns an intended state transition into a signed [`Commitment`]:
//!
//! - [`genesis_state`] and [`transition_state_hash`]: how state hashes are derived
//! - [`CommitmentBuilder`]: mint or transfer, salted, signed by a [`Signer`]
//! - [`CommitmentError`]: ownership and signer failures
//!
//! [`Commitment`]: tokenwire_types::Commitment
//! [`Signer`]: tokenwire_crypto::Signer

pub mod builder;
pub mod error;
pub mod state;

pub use builder::{CommitmentBuilder, PriorState};
pub use error::CommitmentError;
pub use state::{genesis_state, transition_state_hash};
