use alloy_primitives::U256;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::types::beacon::BlockHeader;
use crate::types::light::BlockGenericForBlockBody;

/// A message queued on Vara for delivery to an Ethereum address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossChainMessage {
    /// Nonce as Vara stores it: a little-endian uint256.
    pub nonce_le: [u8; 32],
    /// Actor id of the sending program.
    pub source: [u8; 32],
    /// Ethereum address of the receiving contract.
    pub destination: [u8; 20],
    pub payload: Vec<u8>,
}

impl CrossChainMessage {
    /// The nonce Vara assigned, read as the little-endian integer it is.
    pub fn nonce(&self) -> U256 {
        U256::from_le_bytes(self.nonce_le)
    }

    /// The nonce as the Ethereum message queue indexes it.
    ///
    /// The queue receives the raw little-endian bytes and reads them as a
    /// big-endian uint256, so the same bytes are reinterpreted here.
    pub fn contract_nonce(&self) -> U256 {
        U256::from_be_bytes(self.nonce_le)
    }
}

/// Membership proof of one message hash in the Merkle tree Vara publishes
/// per block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleInclusionProof {
    pub root: [u8; 32],
    pub leaf_index: u64,
    pub num_leaves: u64,
    pub proof: Vec<[u8; 32]>,
}

/// A beacon block in reduced form plus the headers linking it to a
/// checkpoint the destination already trusts.
///
/// `headers` is empty when the checkpoint is the block itself, otherwise it
/// holds every non-skipped slot from `block.slot + 1` up to the checkpoint
/// slot in ascending order.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct BlockInclusionProof {
    pub block: BlockGenericForBlockBody,
    pub headers: Vec<BlockHeader>,
}

/// Everything the Vara event client needs to accept one Ethereum receipt.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ProofResult {
    pub proof_block: BlockInclusionProof,
    /// Receipts trie nodes from root to leaf.
    pub proof: Vec<Vec<u8>>,
    pub transaction_index: u64,
    /// RLP byte-string wrapping the EIP-2718 encoded receipt.
    pub receipt_rlp: Vec<u8>,
}
