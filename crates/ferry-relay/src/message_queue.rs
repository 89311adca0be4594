//! Ethereum message queue contract: merkle roots of Vara message trees and
//! processing of Vara to Ethereum messages.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolEvent, SolInterface};
use async_trait::async_trait;
use ferry_core::types::bridge::{CrossChainMessage, MerkleInclusionProof};
use ferry_core::types::execution::Log;
use futures::{stream, stream::BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::api::hex_to_bytes;
use crate::error::{Error, Result};
use crate::execution::{HttpExecutionClient, LogFilter};
use crate::wait::first_match;

sol! {
    struct VaraMessage {
        uint256 nonce;
        bytes32 source;
        address destination;
        bytes payload;
    }

    interface IMessageQueue {
        error EmergencyStop();
        error InvalidMerkleProof();
        error InvalidPlonkProof();
        error MerkleRootAlreadySet(uint256 blockNumber);
        error MerkleRootNotFound(uint256 blockNumber);
        error MessageAlreadyProcessed(uint256 messageNonce);

        event MerkleRoot(uint256 blockNumber, bytes32 merkleRoot);
        event MessageProcessed(uint256 blockNumber, bytes32 messageHash, uint256 messageNonce, address messageDestination);

        function getMerkleRoot(uint256 blockNumber) external view returns (bytes32);
        function isProcessed(uint256 messageNonce) external view returns (bool);
        function processMessage(uint256 blockNumber, uint256 totalLeaves, uint256 leafIndex, VaraMessage calldata message, bytes32[] calldata proof) external;
    }
}

/// A `MerkleRoot` event: the root of Vara block `block_number`'s message tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleRootLog {
    pub block_number: u64,
    pub merkle_root: B256,
}

/// Arguments of `processMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMessage {
    /// Vara block whose merkle root the proof is checked against.
    pub block_number: u64,
    pub message: CrossChainMessage,
    pub proof: MerkleInclusionProof,
}

impl ProcessMessage {
    pub fn call(&self) -> IMessageQueue::processMessageCall {
        IMessageQueue::processMessageCall {
            blockNumber: U256::from(self.block_number),
            totalLeaves: U256::from(self.proof.num_leaves),
            leafIndex: U256::from(self.proof.leaf_index),
            message: VaraMessage {
                nonce: self.message.contract_nonce(),
                source: B256::from(self.message.source),
                destination: Address::from(self.message.destination),
                payload: Bytes::from(self.message.payload.clone()),
            },
            proof: self.proof.proof.iter().copied().map(B256::from).collect(),
        }
    }

    pub fn calldata(&self) -> Bytes {
        Bytes::from(self.call().abi_encode())
    }
}

/// A mined transaction's status and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub block_number: u64,
    pub status: bool,
    pub logs: Vec<Log>,
}

/// A processed Vara message, as reported by `MessageProcessed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProcessed {
    pub tx_hash: B256,
    /// Ethereum block the transaction was included in.
    pub eth_block_number: u64,
    /// Vara block whose merkle root the proof was checked against.
    pub vara_block_number: u64,
    pub message_hash: B256,
    pub nonce: U256,
    pub destination: Address,
}

/// Message queue contract surface.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Root published for Vara block `block_number`, `None` if unpublished.
    async fn merkle_root(&self, block_number: u64) -> Result<Option<B256>>;

    /// `MerkleRoot` events emitted in Ethereum blocks `from..=to`.
    async fn merkle_root_logs(&self, from: u64, to: u64) -> Result<Vec<MerkleRootLog>>;

    /// `MerkleRoot` events emitted from Ethereum block `from` (the current
    /// head if `None`) onwards.
    async fn merkle_root_events(
        &self,
        from: Option<u64>,
    ) -> Result<BoxStream<'static, Result<MerkleRootLog>>>;

    async fn is_processed(&self, nonce: U256) -> Result<bool>;

    /// Execute `processMessage` without a transaction.
    ///
    /// A revert surfaces as [`Error::Reverted`] naming the contract error.
    async fn simulate_process_message(&self, call: &ProcessMessage) -> Result<()>;

    /// Broadcast `processMessage` and return the transaction hash.
    async fn send_process_message(&self, call: &ProcessMessage) -> Result<B256>;

    /// Wait for `tx_hash` to be mined.
    async fn transaction_outcome(&self, tx_hash: B256) -> Result<TransactionOutcome>;
}

/// Closest root to `target`: the exact block if present, otherwise the
/// lowest block strictly greater than `target`.
pub fn select_merkle_root(logs: &[MerkleRootLog], target: u64) -> Option<MerkleRootLog> {
    if let Some(exact) = logs.iter().find(|l| l.block_number == target) {
        return Some(*exact);
    }
    logs.iter()
        .filter(|l| l.block_number > target)
        .min_by_key(|l| l.block_number)
        .copied()
}

/// Search Ethereum blocks `from..=to` for the root of Vara block `target`,
/// or the closest later one.
///
/// A later root only covers `target` if it was signed by the same authority
/// set; checking that is up to the caller.
pub async fn find_merkle_root_in_range(
    queue: &dyn MessageQueue,
    from: u64,
    to: u64,
    target: u64,
) -> Result<MerkleRootLog> {
    let logs = queue.merkle_root_logs(from, to).await?;
    if logs.is_empty() {
        return Err(Error::NoMerkleRootLogs { from, to });
    }
    debug!(from, to, count = logs.len(), "scanned MerkleRoot logs");
    select_merkle_root(&logs, target).ok_or(Error::NoMerkleRootAfter { target, from, to })
}

/// Root of Vara block `block_number`, waiting for the first root published
/// for it or a later block if none is published yet.
pub async fn wait_for_merkle_root(
    queue: &dyn MessageQueue,
    block_number: u64,
    from: Option<u64>,
) -> Result<MerkleRootLog> {
    if let Some(merkle_root) = queue.merkle_root(block_number).await? {
        return Ok(MerkleRootLog {
            block_number,
            merkle_root,
        });
    }

    info!(block_number, ?from, "merkle root not published yet, subscribing");
    let events = queue.merkle_root_events(from).await?;
    first_match(events, |log| log.block_number >= block_number).await
}

/// Dry-run, then send `processMessage` and read the resulting event.
pub async fn process_message(
    queue: &dyn MessageQueue,
    call: &ProcessMessage,
) -> Result<MessageProcessed> {
    queue.simulate_process_message(call).await?;
    debug!(block_number = call.block_number, "processMessage simulation passed");

    let tx_hash = queue.send_process_message(call).await?;
    info!(%tx_hash, "processMessage sent");

    let outcome = queue.transaction_outcome(tx_hash).await?;
    if !outcome.status {
        return Err(Error::TransactionFailed(tx_hash));
    }

    outcome
        .logs
        .iter()
        .find_map(|log| {
            let topics = log.topics.iter().map(|t| B256::from(*t));
            IMessageQueue::MessageProcessed::decode_raw_log(topics, &log.data).ok()
        })
        .map(|event| {
            Ok(MessageProcessed {
                tx_hash,
                eth_block_number: outcome.block_number,
                vara_block_number: u64::try_from(event.blockNumber)
                    .map_err(|e| Error::malformed("MessageProcessed block number", e))?,
                message_hash: event.messageHash,
                nonce: event.messageNonce,
                destination: event.messageDestination,
            })
        })
        .unwrap_or(Err(Error::MessageProcessedMissing(tx_hash)))
}

/// Name and arguments of the contract error encoded in revert `data`.
pub fn revert_reason(data: &[u8]) -> String {
    use IMessageQueue::IMessageQueueErrors as E;

    match E::abi_decode(data) {
        Ok(E::EmergencyStop(_)) => "EmergencyStop".into(),
        Ok(E::InvalidMerkleProof(_)) => "InvalidMerkleProof".into(),
        Ok(E::InvalidPlonkProof(_)) => "InvalidPlonkProof".into(),
        Ok(E::MerkleRootAlreadySet(e)) => format!("MerkleRootAlreadySet({})", e.blockNumber),
        Ok(E::MerkleRootNotFound(e)) => format!("MerkleRootNotFound({})", e.blockNumber),
        Ok(E::MessageAlreadyProcessed(e)) => {
            format!("MessageAlreadyProcessed({})", e.messageNonce)
        }
        Err(_) => format!("0x{}", hex::encode(data)),
    }
}

/// Map an `eth_call` failure carrying revert data to [`Error::Reverted`].
fn into_revert(err: Error) -> Error {
    match err {
        Error::Rpc {
            data: Some(data), ..
        } => match hex_to_bytes(&data) {
            Ok(bytes) => Error::Reverted(revert_reason(&bytes)),
            Err(_) => Error::Reverted(data),
        },
        Error::Rpc { message, .. } if message.contains("revert") => Error::Reverted(message),
        other => other,
    }
}

/// [`MessageQueue`] over Ethereum JSON-RPC.
///
/// `MerkleRoot` events are observed by polling `eth_getLogs`.
#[derive(Clone)]
pub struct HttpMessageQueue {
    eth: HttpExecutionClient,
    address: Address,
    sender: Option<Address>,
    poll_interval: Duration,
}

impl HttpMessageQueue {
    pub fn new(
        eth: HttpExecutionClient,
        address: Address,
        sender: Option<Address>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            eth,
            address,
            sender,
            poll_interval,
        }
    }

    async fn view<C: SolCall>(&self, call: C) -> Result<C::Return> {
        let data = Bytes::from(call.abi_encode());
        let output = self
            .eth
            .call(None, self.address, &data)
            .await
            .map_err(into_revert)?;
        C::abi_decode_returns(&output).map_err(|e| Error::malformed(C::SIGNATURE, e))
    }
}

fn decode_merkle_root_log(log: &crate::api::ApiLog) -> Result<MerkleRootLog> {
    let core = log.to_core().map_err(|e| Error::malformed("MerkleRoot log", e))?;
    let event = IMessageQueue::MerkleRoot::decode_raw_log(
        core.topics.iter().map(|t| B256::from(*t)),
        &core.data,
    )
    .map_err(|e| Error::malformed("MerkleRoot log", e))?;

    Ok(MerkleRootLog {
        block_number: u64::try_from(event.blockNumber)
            .map_err(|e| Error::malformed("MerkleRoot block number", e))?,
        merkle_root: event.merkleRoot,
    })
}

#[async_trait]
impl MessageQueue for HttpMessageQueue {
    async fn merkle_root(&self, block_number: u64) -> Result<Option<B256>> {
        let root = self
            .view(IMessageQueue::getMerkleRootCall {
                blockNumber: U256::from(block_number),
            })
            .await?;
        Ok((root != B256::ZERO).then_some(root))
    }

    async fn merkle_root_logs(&self, from: u64, to: u64) -> Result<Vec<MerkleRootLog>> {
        let filter = LogFilter::new(
            self.address,
            IMessageQueue::MerkleRoot::SIGNATURE_HASH,
            from,
            to,
        );
        self.eth
            .logs(&filter)
            .await?
            .iter()
            .map(decode_merkle_root_log)
            .collect()
    }

    async fn merkle_root_events(
        &self,
        from: Option<u64>,
    ) -> Result<BoxStream<'static, Result<MerkleRootLog>>> {
        let start = match from {
            Some(from) => from,
            None => self.eth.block_number().await?,
        };
        let this = self.clone();

        let batches = stream::unfold(start, move |next| {
            let this = this.clone();
            async move {
                loop {
                    let head = match this.eth.block_number().await {
                        Ok(head) => head,
                        Err(e) => return Some((Err(e), next)),
                    };
                    if head >= next {
                        return match this.merkle_root_logs(next, head).await {
                            Ok(logs) => Some((Ok(logs), head + 1)),
                            Err(e) => Some((Err(e), next)),
                        };
                    }
                    tokio::time::sleep(this.poll_interval).await;
                }
            }
        });

        Ok(batches
            .map_ok(|logs| stream::iter(logs.into_iter().map(Ok)))
            .try_flatten()
            .boxed())
    }

    async fn is_processed(&self, nonce: U256) -> Result<bool> {
        self.view(IMessageQueue::isProcessedCall {
            messageNonce: nonce,
        })
        .await
    }

    async fn simulate_process_message(&self, call: &ProcessMessage) -> Result<()> {
        self.eth
            .call(self.sender, self.address, &call.calldata())
            .await
            .map_err(into_revert)?;
        Ok(())
    }

    async fn send_process_message(&self, call: &ProcessMessage) -> Result<B256> {
        let sender = self
            .sender
            .ok_or_else(|| Error::Config("ethereum.sender is required to send transactions".into()))?;
        self.eth
            .send_transaction(sender, self.address, &call.calldata())
            .await
            .map_err(into_revert)
    }

    async fn transaction_outcome(&self, tx_hash: B256) -> Result<TransactionOutcome> {
        let receipt = self.eth.wait_for_receipt(tx_hash, self.poll_interval).await?;
        let receipt = receipt
            .to_core()
            .map_err(|e| Error::malformed("transaction receipt", e))?;
        Ok(TransactionOutcome {
            block_number: receipt.block_number,
            status: receipt.envelope.status,
            logs: receipt.envelope.logs,
        })
    }
}
