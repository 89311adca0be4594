//! Error types for the relayer.

use std::io;

use alloy_primitives::B256;
use ferry_core::{BridgeError, HeaderChainError, ProofError, WireError};
use thiserror::Error;

use crate::proxy::ProxyError;

/// Errors that can occur while composing proofs or relaying messages.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to load or parse configuration.
    #[error("config error: {0}")]
    Config(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Beacon node answered with a non-success status.
    #[error("{url} answered with status {status}: {body}")]
    HttpStatus { url: String, status: u16, body: String },

    /// JSON-RPC error returned by a node.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        /// Revert data, when the node attaches it.
        data: Option<String>,
    },

    /// Failed to parse a response.
    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A response field did not have the expected shape.
    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml_edit::de::Error),

    #[error("transaction {0} not found")]
    TransactionNotFound(B256),

    #[error("block {0} not found")]
    BlockNotFound(String),

    #[error("block {block} is missing receipts: expected {expected}, got {actual}")]
    IncompleteReceipts { block: B256, expected: usize, actual: usize },

    #[error(transparent)]
    Proof(#[from] ProofError),

    /// The beacon block at the transaction's slot carries a different
    /// execution payload than the block holding the receipt.
    #[error(
        "beacon block at slot {slot} carries execution block {payload_block_hash} \
         (receipts root {payload_receipts_root}), expected {block_hash} \
         (receipts root {receipts_root})"
    )]
    PayloadMismatch {
        slot: u64,
        block_hash: B256,
        receipts_root: B256,
        payload_block_hash: B256,
        payload_receipts_root: B256,
    },

    #[error(transparent)]
    HeaderChain(#[from] HeaderChainError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("historical proxy error: {0}")]
    Proxy(#[from] ProxyError),

    /// Block timestamp precedes beacon genesis.
    #[error("timestamp {timestamp} precedes genesis {genesis}")]
    SlotBeforeGenesis { timestamp: u64, genesis: u64 },

    /// No checkpoint covers the slot yet.
    #[error("no checkpoint at or after slot {0} yet")]
    NotPresent(u64),

    /// The slot is older than anything the checkpoint client still knows.
    #[error("slot {0} is older than the oldest stored checkpoint")]
    OutDated(u64),

    /// A program answered with an error reply.
    #[error("program {program} replied with error: {reason}")]
    Program { program: B256, reason: String },

    #[error("message with nonce {nonce} not found in Vara block {block}")]
    MessageNotFound { block: u64, nonce: String },

    #[error("no merkle root published for Vara block {0}")]
    MerkleRootNotFound(u64),

    #[error("no MerkleRoot events in Ethereum blocks {from}..={to}")]
    NoMerkleRootLogs { from: u64, to: u64 },

    #[error("no merkle root for a Vara block after {target} in Ethereum blocks {from}..={to}")]
    NoMerkleRootAfter { target: u64, from: u64, to: u64 },

    /// The nearest published root belongs to another authority set.
    #[error(
        "merkle root for Vara block {candidate} was signed by authority set {candidate_set}, \
         message block {block} belongs to set {block_set}"
    )]
    NoCompatibleMerkleRoot {
        block: u64,
        candidate: u64,
        block_set: u64,
        candidate_set: u64,
    },

    /// The proof Vara produced commits to a different root than the one
    /// published on Ethereum.
    #[error("proof root {proof} does not match published merkle root {published}")]
    ProofRootMismatch { proof: B256, published: B256 },

    /// The message queue rejected the call.
    #[error("message queue reverted: {0}")]
    Reverted(String),

    #[error("transaction {0} succeeded but emitted no MessageProcessed event")]
    MessageProcessedMissing(B256),

    #[error("transaction {0} reverted on chain")]
    TransactionFailed(B256),

    /// An event stream closed before producing a match.
    #[error("subscription closed: {0}")]
    Subscription(String),
}

impl Error {
    pub(crate) fn malformed(what: &'static str, reason: impl ToString) -> Self {
        Error::Malformed {
            what,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
