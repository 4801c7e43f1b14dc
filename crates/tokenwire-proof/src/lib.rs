//! # tokenwire-proof
//!
//! Getting from a submitted commitment to a verdict:
//!
//! - [`ProofPoller`] / [`poll_for_proof`]: bounded, cancellable polling for a
//!   complete inclusion proof
//! - [`ProofValidator`]: classifies a proof as `Confirmed`, `Incomplete` or
//!   `Rejected` against an explicitly supplied trust base
//! - [`verify_inclusion`]: the path-and-certificate check on its own

pub mod error;
pub mod poller;
pub mod validator;

pub use error::PollError;
pub use poller::{poll_for_proof, PollOutcome, PollState, PollerConfig, ProofPoller};
pub use validator::{verify_inclusion, ProofValidator, ValidationContext};
