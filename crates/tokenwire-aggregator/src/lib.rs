//! # tokenwire-aggregator
//!
//! The boundary between the client pipeline and the network's aggregator:
//!
//! - [`AggregatorClient`]: `submit` and `query_proof`, the only two calls made
//! - [`JsonRpcAggregator`]: JSON-RPC 2.0 over HTTP (`reqwest`)
//! - [`InMemoryAggregator`]: builds a sparse Merkle tree per round and
//!   certifies it with a [`TestNetwork`]'s validator keys
//! - [`ScriptedAggregator`]: replays canned answers
//!
//! Proof objects are passed through exactly as received. Nothing in this
//! crate fills in or repairs a missing proof field.

pub mod client;
pub mod error;
pub mod jsonrpc;
pub mod memory;
pub mod network;
pub mod scripted;
pub mod tree;

pub use client::{AggregatorClient, ProofResponse, SubmitOutcome};
pub use error::{AggregatorError, AggregatorResult};
pub use jsonrpc::{AggregatorConfig, JsonRpcAggregator};
pub use memory::InMemoryAggregator;
pub use network::TestNetwork;
pub use scripted::ScriptedAggregator;
pub use tree::SparseTree;
