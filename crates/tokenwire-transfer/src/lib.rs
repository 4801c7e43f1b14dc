//! # tokenwire-transfer
//!
//! Token lifecycle on the client side:
//!
//! - [`Token`]: `Draft -> Submitted -> AwaitingProof -> Confirmed | Rejected`,
//!   with confirmed history and ownership tracking
//! - [`TransitionPipeline`]: submit, poll, validate, apply
//! - [`TransferEnvelope`] / [`EnvelopeReceiver`]: hand a pending transfer to
//!   its recipient out of band and let them finish it
//!
//! A token only reaches `Confirmed` through a proof that the
//! [`tokenwire_proof::ProofValidator`] accepted.

pub mod envelope;
pub mod pipeline;
pub mod token;

pub use envelope::{EnvelopeError, EnvelopeReceiver, TransferEnvelope, ENVELOPE_VERSION};
pub use pipeline::{PipelineError, TransitionOutcome, TransitionPipeline};
pub use token::{
    verify_history, HistoryFault, PendingTransition, RejectedTransition, RejectionCause, Token,
    TokenHistoryEntry, TokenStateError, TokenStatus,
};
