use alloy_primitives::{Bytes, B256};
use alloy_trie::{proof::ProofRetainer, HashBuilder, Nibbles};
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

use crate::execution::receipt::{encode_receipt, receipt_key, wrap_receipt_rlp};
use crate::types::execution::{ReceiptEnvelope, TrieInclusionProof};

/// Errors while building or checking receipts trie proofs.
/// Each variant is specific enough to diagnose exactly what went wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    #[error("Receipt for transaction index {index} not found among {count} receipts")]
    ReceiptNotFound { index: u64, count: usize },

    #[error("Receipts root mismatch: computed {computed}, block declares {expected}")]
    ReceiptsRootMismatch { computed: String, expected: String },

    #[error("Invalid receipt encoding: {reason}")]
    InvalidReceipt { reason: String },

    #[error("Proof does not verify against root {root}: {reason}")]
    InvalidProof { root: String, reason: String },

    #[error("Empty proof provided")]
    EmptyProof,
}

/// Compute keccak256 hash of data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Compute the receipts root of a block from its receipts in block order.
pub fn receipts_root(receipts: &[ReceiptEnvelope]) -> [u8; 32] {
    let mut builder = HashBuilder::default();
    for (key, value) in sorted_leaves(receipts) {
        builder.add_leaf(key, &value);
    }
    builder.root().0
}

/// Build the inclusion proof of the receipt at `index`.
///
/// `receipts` must be every receipt of the block in transaction order: the
/// whole trie is rebuilt, and its root must equal `expected_root` (the
/// block's declared receipts root) before the proof is returned.
pub fn build_receipt_proof(
    receipts: &[ReceiptEnvelope],
    index: u64,
    expected_root: &[u8; 32],
) -> Result<TrieInclusionProof, ProofError> {
    let target = usize::try_from(index)
        .ok()
        .and_then(|i| receipts.get(i))
        .ok_or(ProofError::ReceiptNotFound {
            index,
            count: receipts.len(),
        })?;

    let retainer = ProofRetainer::new(vec![Nibbles::unpack(receipt_key(index))]);
    let mut builder = HashBuilder::default().with_proof_retainer(retainer);
    for (key, value) in sorted_leaves(receipts) {
        builder.add_leaf(key, &value);
    }

    let root = builder.root();
    if root.0 != *expected_root {
        return Err(ProofError::ReceiptsRootMismatch {
            computed: hex::encode(root),
            expected: hex::encode(expected_root),
        });
    }

    // Proof nodes sort by path, which for a single target is root to leaf.
    let nodes = builder
        .take_proof_nodes()
        .into_nodes_sorted()
        .into_iter()
        .map(|(_, node)| node.to_vec())
        .collect();

    Ok(TrieInclusionProof {
        nodes,
        receipt: encode_receipt(target),
    })
}

impl TrieInclusionProof {
    /// The receipt wrapped as an RLP byte string.
    pub fn receipt_rlp(&self) -> Vec<u8> {
        wrap_receipt_rlp(&self.receipt)
    }
}

/// Verify that `receipt` is stored under `index` in the trie with root `root`.
pub fn verify_receipt_proof(
    root: &[u8; 32],
    index: u64,
    nodes: &[Vec<u8>],
    receipt: &[u8],
) -> Result<(), ProofError> {
    if nodes.is_empty() {
        return Err(ProofError::EmptyProof);
    }

    let proof: Vec<Bytes> = nodes.iter().map(|n| Bytes::copy_from_slice(n)).collect();
    alloy_trie::proof::verify_proof(
        B256::from(*root),
        Nibbles::unpack(receipt_key(index)),
        Some(receipt.to_vec()),
        &proof,
    )
    .map_err(|e| ProofError::InvalidProof {
        root: hex::encode(root),
        reason: e.to_string(),
    })
}

/// Trie leaves sorted by key nibbles, as the hash builder requires.
fn sorted_leaves(receipts: &[ReceiptEnvelope]) -> Vec<(Nibbles, Vec<u8>)> {
    let mut leaves: Vec<_> = receipts
        .iter()
        .enumerate()
        .map(|(i, r)| (Nibbles::unpack(receipt_key(i as u64)), encode_receipt(r)))
        .collect();
    leaves.sort_by(|a, b| a.0.cmp(&b.0));
    leaves
}
