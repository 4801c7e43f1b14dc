//! Sparse Merkle tree over request ids, as the aggregator builds it.

use std::collections::BTreeMap;

use tokenwire_types::merkle::{combine, leaf_hash};
use tokenwire_types::{DataHash, MerklePath, MerkleStep, RequestId, TREE_DEPTH};

/// A sealed tree: leaves sorted by request id, root computed once.
#[derive(Clone, Debug)]
pub struct SparseTree {
    leaves: Vec<(RequestId, DataHash)>,
    root: DataHash,
}

impl SparseTree {
    /// Build from `request_id -> transaction_hash`.
    pub fn build(entries: &BTreeMap<RequestId, DataHash>) -> Self {
        let leaves: Vec<(RequestId, DataHash)> = entries
            .iter()
            .map(|(id, tx)| (*id, leaf_hash(id, tx)))
            .collect();
        let root = subtree(&leaves, 0);
        Self { leaves, root }
    }

    pub fn root(&self) -> DataHash {
        self.root
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.leaves
            .binary_search_by(|(id, _)| id.cmp(request_id))
            .is_ok()
    }

    /// Path from the leaf of `request_id` to the root, or `None` if the id
    /// is not in the tree.
    pub fn path(&self, request_id: &RequestId) -> Option<MerklePath> {
        if !self.contains(request_id) {
            return None;
        }

        let mut steps = Vec::new();
        let mut slice = &self.leaves[..];
        for depth in 0..TREE_DEPTH {
            let (left, right) = split(slice, depth);
            let (ours, theirs) = if request_id.bit(depth) {
                (right, left)
            } else {
                (left, right)
            };
            let sibling = subtree(theirs, depth + 1);
            if !sibling.is_zero() {
                steps.push(MerkleStep {
                    depth: depth as u16,
                    sibling,
                });
            }
            slice = ours;
        }
        steps.reverse();

        Some(MerklePath {
            root: self.root,
            steps,
        })
    }
}

/// Split a sorted slice sharing the first `depth` bits by bit `depth`.
fn split(leaves: &[(RequestId, DataHash)], depth: usize) -> (&[(RequestId, DataHash)], &[(RequestId, DataHash)]) {
    let mid = leaves.partition_point(|(id, _)| !id.bit(depth));
    leaves.split_at(mid)
}

fn subtree(leaves: &[(RequestId, DataHash)], depth: usize) -> DataHash {
    match leaves {
        [] => DataHash::ZERO,
        [(_, leaf)] if depth == TREE_DEPTH => *leaf,
        _ => {
            let (left, right) = split(leaves, depth);
            combine(&subtree(left, depth + 1), &subtree(right, depth + 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seed: u8) -> RequestId {
        RequestId::from_bytes(*DataHash::digest(&[seed]).as_bytes())
    }

    fn entries(n: u8) -> BTreeMap<RequestId, DataHash> {
        (0..n).map(|i| (id(i), DataHash::digest(&[i, i]))).collect()
    }

    #[test]
    fn every_path_folds_to_root() {
        let entries = entries(17);
        let tree = SparseTree::build(&entries);
        assert_eq!(tree.len(), 17);
        for (rid, tx) in &entries {
            let path = tree.path(rid).unwrap();
            assert!(path.check_structure().is_ok());
            assert_eq!(path.compute_root(rid, tx), tree.root());
        }
    }

    #[test]
    fn single_leaf_has_empty_path() {
        let entries = entries(1);
        let tree = SparseTree::build(&entries);
        let (rid, tx) = entries.iter().next().unwrap();
        let path = tree.path(rid).unwrap();
        assert!(path.steps.is_empty());
        assert_eq!(path.compute_root(rid, tx), tree.root());
    }

    #[test]
    fn wrong_transaction_does_not_fold_to_root() {
        let entries = entries(4);
        let tree = SparseTree::build(&entries);
        let rid = entries.keys().next().unwrap();
        let path = tree.path(rid).unwrap();
        assert_ne!(path.compute_root(rid, &DataHash::digest(b"forged")), tree.root());
    }

    #[test]
    fn unknown_id_has_no_path() {
        let tree = SparseTree::build(&entries(3));
        assert!(tree.path(&id(200)).is_none());
        assert!(SparseTree::build(&BTreeMap::new()).root().is_zero());
    }
}
