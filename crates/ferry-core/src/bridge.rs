//! Vara to Ethereum message identity and proof sanity checks.

use thiserror::Error;

use crate::execution::proof::keccak256;
use crate::types::bridge::{CrossChainMessage, MerkleInclusionProof};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Leaf index {leaf_index} is outside a tree of {num_leaves} leaves")]
    LeafIndexOutOfRange { leaf_index: u64, num_leaves: u64 },

    #[error("Proof has {len} siblings, a tree of {num_leaves} leaves needs at most {max}")]
    ProofTooLong { len: usize, num_leaves: u64, max: usize },

    #[error("Merkle root is zero")]
    ZeroRoot,
}

impl CrossChainMessage {
    /// keccak256(nonce_le ++ source ++ destination ++ payload).
    ///
    /// The leaf Vara commits to in its per-block message tree, and the hash
    /// the Ethereum message queue reports in `MessageProcessed`.
    pub fn hash(&self) -> [u8; 32] {
        let mut data = Vec::with_capacity(32 + 32 + 20 + self.payload.len());
        data.extend_from_slice(&self.nonce_le);
        data.extend_from_slice(&self.source);
        data.extend_from_slice(&self.destination);
        data.extend_from_slice(&self.payload);
        keccak256(&data)
    }
}

impl MerkleInclusionProof {
    /// Check the proof's shape: the leaf lies inside the tree, the sibling
    /// count fits the tree height, and the root is set.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.leaf_index >= self.num_leaves {
            return Err(BridgeError::LeafIndexOutOfRange {
                leaf_index: self.leaf_index,
                num_leaves: self.num_leaves,
            });
        }

        let max = tree_height(self.num_leaves);
        if self.proof.len() > max {
            return Err(BridgeError::ProofTooLong {
                len: self.proof.len(),
                num_leaves: self.num_leaves,
                max,
            });
        }

        if self.root == [0u8; 32] {
            return Err(BridgeError::ZeroRoot);
        }

        Ok(())
    }
}

/// ceil(log2(leaves)).
fn tree_height(leaves: u64) -> usize {
    if leaves <= 1 {
        0
    } else {
        (u64::BITS - (leaves - 1).leading_zeros()) as usize
    }
}
