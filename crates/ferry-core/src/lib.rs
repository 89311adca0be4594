//! # Ferry Core
//!
//! Pure Rust proof composition for the Ethereum <-> Vara bridge.
//!
//! This crate contains **no networking code**. Every proof the relayer sends
//! in either direction is assembled and sanity-checked here, so the same
//! bytes the destination verifier will see can be reproduced offline.
//!
//! ## Ethereum to Vara
//!
//! - **Receipts trie** (`execution` module): rebuilds the block's receipts
//!   Merkle-Patricia trie, checks it against the declared receipts root and
//!   extracts the branch proving one receipt.
//!
//! - **Block reduction** (`consensus` module): merkleizes a full Electra
//!   beacon block into the reduced form the Vara light client verifies, and
//!   checks that a header chain links it to a trusted checkpoint.
//!
//! - **Wire format** (`wire` module): SCALE encoding of the final proof and
//!   of the routed program calls that carry it.
//!
//! ## Vara to Ethereum
//!
//! - **Messages** (`bridge` module): message hashing and Merkle proof shape
//!   checks before a proof is handed to the Ethereum message queue.
//!
//! ## Usage
//!
//! ```ignore
//! use ferry_core::execution::proof::build_receipt_proof;
//! use ferry_core::consensus::block::reduce_block;
//! use ferry_core::wire::encode_proof_result;
//! ```

pub mod bridge;
pub mod consensus;
pub mod execution;
pub mod types;
pub mod wire;

// Re-export commonly used types for convenience
pub use bridge::BridgeError;
pub use consensus::{
    block::{
        hash_beacon_block, hash_block_header, hash_reduced_block, hash_reduced_body, reduce_block,
    },
    header_chain::{verify_header_chain, HeaderChainError},
    slot_at,
};
pub use execution::{
    proof::{build_receipt_proof, keccak256, receipts_root, verify_receipt_proof, ProofError},
    receipt::{decode_receipt, encode_receipt},
};
pub use types::{
    beacon::{BeaconBlock, BlockHeader},
    bridge::*,
    execution::*,
    light::BlockGenericForBlockBody,
};
pub use wire::{decode_proof_result, encode_proof_result, WireError};
