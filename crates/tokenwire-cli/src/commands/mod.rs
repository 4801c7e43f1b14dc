//! Command implementations

pub mod keygen;
pub mod mint;
pub mod receive;
pub mod send;
pub mod verify;

use tokenwire_aggregator::JsonRpcAggregator;
use tokenwire_proof::ProofValidator;
use tokenwire_transfer::{Token, TransitionOutcome};
use tokenwire_types::{PredicateParams, PublicKey, ValidationVerdict};

use crate::config::CliConfig;
use crate::error::{class_exit_code, CliResult, EXIT_CONFIRMED, EXIT_REJECTED, EXIT_RETRY};

/// What a command finished with, before it becomes an exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Done,
    Transition(TransitionOutcome),
    Verdict(ValidationVerdict),
}

impl Report {
    pub fn exit_code(&self) -> u8 {
        match self {
            Report::Done | Report::Transition(TransitionOutcome::Confirmed) => EXIT_CONFIRMED,
            Report::Transition(TransitionOutcome::Rejected(cause)) => class_exit_code(cause.class()),
            Report::Verdict(ValidationVerdict::Confirmed) => EXIT_CONFIRMED,
            Report::Verdict(ValidationVerdict::Rejected(_)) => EXIT_REJECTED,
            Report::Verdict(ValidationVerdict::Incomplete(_)) => EXIT_RETRY,
        }
    }
}

/// Aggregator client and validator for commands that talk to the network.
pub struct Network {
    pub aggregator: JsonRpcAggregator,
    pub validator: ProofValidator,
}

impl Network {
    pub fn connect(config: &CliConfig) -> CliResult<Self> {
        Ok(Self {
            aggregator: JsonRpcAggregator::new(&config.aggregator)?,
            validator: ProofValidator::new(config.trust_base()?),
        })
    }
}

pub fn recipient_predicate(key: PublicKey, masked: bool) -> PredicateParams {
    if masked {
        PredicateParams::masked(key, tokenwire_types::Nonce::random())
    } else {
        PredicateParams::unmasked(key)
    }
}

pub fn print_outcome(token: &Token, outcome: &TransitionOutcome) {
    match outcome {
        TransitionOutcome::Confirmed => {
            println!("confirmed {} ({} transitions)", token.id(), token.history().len());
        }
        TransitionOutcome::Rejected(cause) => {
            println!("rejected {}: {cause}", token.id());
        }
    }
}
