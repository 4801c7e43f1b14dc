//! Sparse Merkle path folding.
//!
//! The aggregator keeps a 256-level sparse Merkle tree keyed by request id
//! bits (depth 0 is the root split). Empty subtrees hash to [`DataHash::ZERO`]
//! and `combine(ZERO, ZERO) = ZERO`, so a path only needs to carry the
//! non-empty siblings, each tagged with the depth at which it is combined.

use serde::{Deserialize, Serialize};

use crate::commitment::RequestId;
use crate::hash::{DataHash, DomainHasher};

/// Number of levels in the tree (one per request id bit).
pub const TREE_DEPTH: usize = 256;

const LEAF_DOMAIN: &str = "tokenwire/smt-leaf";
const NODE_DOMAIN: &str = "tokenwire/smt-node";

/// Leaf value for an included commitment.
pub fn leaf_hash(request_id: &RequestId, transaction_hash: &DataHash) -> DataHash {
    DomainHasher::new(LEAF_DOMAIN)
        .update(request_id.as_bytes())
        .update(transaction_hash.as_bytes())
        .finalize()
}

/// Interior node hash.
pub fn combine(left: &DataHash, right: &DataHash) -> DataHash {
    if left.is_zero() && right.is_zero() {
        return DataHash::ZERO;
    }
    DomainHasher::new(NODE_DOMAIN)
        .update(left.as_bytes())
        .update(right.as_bytes())
        .finalize()
}

/// A non-empty sibling on the way from the leaf to the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleStep {
    pub depth: u16,
    pub sibling: DataHash,
}

/// Claimed root plus the siblings needed to recompute it, leaf to root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub root: DataHash,
    #[serde(default)]
    pub steps: Vec<MerkleStep>,
}

/// Structural defects of a path, found without hashing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "defect", rename_all = "snake_case")]
pub enum PathDefect {
    #[error("path root is the empty-tree hash")]
    ZeroRoot,
    #[error("path has {count} steps, more than the tree depth")]
    TooManySteps { count: usize },
    #[error("step depth {depth} is outside the tree")]
    DepthOutOfRange { depth: u16 },
    #[error("step depth {depth} does not follow {previous} (must strictly decrease)")]
    DepthsNotDecreasing { previous: u16, depth: u16 },
    #[error("step at depth {depth} carries an empty sibling")]
    ZeroSibling { depth: u16 },
}

impl MerklePath {
    /// Check that the path is well formed: non-zero root, at most one step
    /// per level, depths strictly decreasing inside the tree, no empty
    /// siblings (those are implicit).
    pub fn check_structure(&self) -> Result<(), PathDefect> {
        if self.root.is_zero() {
            return Err(PathDefect::ZeroRoot);
        }
        if self.steps.len() > TREE_DEPTH {
            return Err(PathDefect::TooManySteps {
                count: self.steps.len(),
            });
        }
        let mut previous: Option<u16> = None;
        for step in &self.steps {
            if usize::from(step.depth) >= TREE_DEPTH {
                return Err(PathDefect::DepthOutOfRange { depth: step.depth });
            }
            if let Some(prev) = previous {
                if step.depth >= prev {
                    return Err(PathDefect::DepthsNotDecreasing {
                        previous: prev,
                        depth: step.depth,
                    });
                }
            }
            if step.sibling.is_zero() {
                return Err(PathDefect::ZeroSibling { depth: step.depth });
            }
            previous = Some(step.depth);
        }
        Ok(())
    }

    /// Fold the path from the leaf for `(request_id, transaction_hash)` up
    /// to the root. Only meaningful for a path that passed
    /// [`MerklePath::check_structure`]; steps out of order are skipped.
    pub fn compute_root(&self, request_id: &RequestId, transaction_hash: &DataHash) -> DataHash {
        let mut steps = self.steps.iter().peekable();
        let mut node = leaf_hash(request_id, transaction_hash);
        for depth in (0..TREE_DEPTH).rev() {
            let sibling = match steps.peek() {
                Some(step) if usize::from(step.depth) == depth => {
                    let sibling = step.sibling;
                    steps.next();
                    sibling
                }
                _ => DataHash::ZERO,
            };
            node = if request_id.bit(depth) {
                combine(&sibling, &node)
            } else {
                combine(&node, &sibling)
            };
        }
        node
    }
}
