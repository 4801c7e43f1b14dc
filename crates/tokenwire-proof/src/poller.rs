//! Proof polling with capped exponential backoff.
//!
//! [`ProofPoller`] is a plain state machine: each aggregator answer is fed
//! to [`ProofPoller::tick`] together with the current time, and the poller
//! says whether to keep going and how long to wait. [`poll_for_proof`] is
//! the async driver that owns the timer and the cancellation token.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokenwire_aggregator::{AggregatorClient, AggregatorError, AggregatorResult, ProofResponse};
use tokenwire_types::{ErrorClass, InclusionProof, RequestId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PollError;

/// Backoff and deadline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// First wait between queries, in milliseconds
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    /// Growth factor applied to the wait after each query
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on a single wait, in milliseconds
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// Overall time budget, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Transient errors tolerated in a row before giving up
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            multiplier: default_multiplier(),
            max_interval_ms: default_max_interval_ms(),
            deadline_secs: default_deadline_secs(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl PollerConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn validate(&self) -> Result<(), PollError> {
        if self.initial_interval_ms == 0 {
            return Err(PollError::InvalidConfig {
                field: "initial_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(PollError::InvalidConfig {
                field: "multiplier",
                reason: format!("{} is not a finite factor >= 1", self.multiplier),
            });
        }
        if self.max_interval_ms < self.initial_interval_ms {
            return Err(PollError::InvalidConfig {
                field: "max_interval_ms",
                reason: "must not be below initial_interval_ms".into(),
            });
        }
        if self.deadline_secs == 0 {
            return Err(PollError::InvalidConfig {
                field: "deadline_secs",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_interval_ms() -> u64 {
    10_000
}

fn default_deadline_secs() -> u64 {
    120
}

fn default_max_consecutive_errors() -> u32 {
    5
}

/// How polling ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The aggregator answered with every required proof part present.
    Ready(InclusionProof),
    /// The deadline passed without a complete proof.
    Timeout { attempts: u32 },
    /// Too many transient errors in a row, or a non-retryable one.
    Fatal(AggregatorError),
    Cancelled,
}

impl PollOutcome {
    /// Error class of an outcome that carries no proof.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            PollOutcome::Ready(_) => None,
            PollOutcome::Timeout { .. } | PollOutcome::Cancelled => {
                Some(ErrorClass::NotYetIncluded)
            }
            PollOutcome::Fatal(err) => Some(err.class()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Done(PollOutcome),
}

/// Polling state for one request id.
#[derive(Debug)]
pub struct ProofPoller {
    request_id: RequestId,
    config: PollerConfig,
    deadline: Instant,
    backoff: Duration,
    next_delay: Duration,
    attempts: u32,
    consecutive_errors: u32,
    state: PollState,
}

impl ProofPoller {
    pub fn new(request_id: RequestId, config: PollerConfig, now: Instant) -> Result<Self, PollError> {
        config.validate()?;
        Ok(Self {
            request_id,
            deadline: now + config.deadline(),
            backoff: config.initial_interval(),
            next_delay: Duration::ZERO,
            attempts: 0,
            consecutive_errors: 0,
            state: PollState::Polling,
            config,
        })
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, PollState::Done(_))
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait before the next query. Never extends past the deadline.
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// Feed one aggregator answer observed at `now`.
    pub fn tick(&mut self, response: AggregatorResult<ProofResponse>, now: Instant) -> &PollState {
        if self.is_done() {
            return &self.state;
        }
        self.attempts += 1;

        match response {
            Ok(ProofResponse::Found(proof)) => match proof.missing_field() {
                None => {
                    info!(
                        request_id = %self.request_id,
                        attempts = self.attempts,
                        "Inclusion proof received"
                    );
                    return self.finish(PollOutcome::Ready(proof));
                }
                Some(field) => {
                    debug!(
                        request_id = %self.request_id,
                        missing = %field,
                        "Proof not complete yet"
                    );
                    self.consecutive_errors = 0;
                }
            },
            Ok(ProofResponse::NotFound) => {
                debug!(request_id = %self.request_id, attempt = self.attempts, "Proof not found yet");
                self.consecutive_errors = 0;
            }
            Err(err) if err.is_transient() => {
                self.consecutive_errors += 1;
                warn!(
                    request_id = %self.request_id,
                    error = %err,
                    consecutive = self.consecutive_errors,
                    "Aggregator query failed"
                );
                if self.consecutive_errors > self.config.max_consecutive_errors {
                    return self.finish(PollOutcome::Fatal(err));
                }
            }
            Err(err) => {
                warn!(request_id = %self.request_id, error = %err, "Aggregator query failed permanently");
                return self.finish(PollOutcome::Fatal(err));
            }
        }

        if now >= self.deadline {
            info!(
                request_id = %self.request_id,
                attempts = self.attempts,
                "Proof deadline elapsed"
            );
            return self.finish(PollOutcome::Timeout {
                attempts: self.attempts,
            });
        }

        self.next_delay = self.backoff.min(self.deadline - now);
        self.backoff = self.grow(self.backoff);
        &self.state
    }

    /// The deadline passed while a query was still in flight. The
    /// abandoned query counts as an attempt.
    pub fn expire(&mut self) -> &PollState {
        if self.is_done() {
            return &self.state;
        }
        self.attempts += 1;
        info!(
            request_id = %self.request_id,
            attempts = self.attempts,
            "Proof deadline elapsed during a query"
        );
        self.finish(PollOutcome::Timeout {
            attempts: self.attempts,
        })
    }

    /// Stop polling. Has no effect once a terminal outcome was reached.
    pub fn cancel(&mut self) -> &PollState {
        if !self.is_done() {
            info!(request_id = %self.request_id, "Proof polling cancelled");
            self.state = PollState::Done(PollOutcome::Cancelled);
        }
        &self.state
    }

    /// Terminal outcome, if any.
    pub fn into_outcome(self) -> Option<PollOutcome> {
        match self.state {
            PollState::Done(outcome) => Some(outcome),
            PollState::Polling => None,
        }
    }

    fn finish(&mut self, outcome: PollOutcome) -> &PollState {
        self.state = PollState::Done(outcome);
        &self.state
    }

    fn grow(&self, current: Duration) -> Duration {
        let max = self.config.max_interval();
        Duration::try_from_secs_f64(current.as_secs_f64() * self.config.multiplier)
            .unwrap_or(max)
            .min(max)
    }
}

/// Poll `client` until a complete proof arrives, the deadline passes, the
/// error budget is spent, or `cancel` fires.
pub async fn poll_for_proof<C: AggregatorClient + ?Sized>(
    client: &C,
    request_id: &RequestId,
    config: &PollerConfig,
    cancel: &CancellationToken,
) -> Result<PollOutcome, PollError> {
    let mut poller = ProofPoller::new(*request_id, config.clone(), Instant::now())?;

    loop {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                poller.cancel();
                break;
            }
            response = client.query_proof(request_id) => response,
            _ = tokio::time::sleep_until(poller.deadline()) => {
                poller.expire();
                break;
            }
        };

        if poller.tick(response, Instant::now()) != &PollState::Polling {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                poller.cancel();
                break;
            }
            _ = tokio::time::sleep(poller.next_delay()) => {}
        }
    }

    poller.into_outcome().ok_or(PollError::Unfinished)
}
