//! Ethereum to Vara proof composition.
//!
//! Given a transaction hash, assembles everything the Vara event client needs
//! to accept its receipt:
//!
//! 1. the receipt and its Merkle-Patricia branch in the block's receipts trie
//! 2. the beacon block carrying the execution block, in reduced form
//! 3. the beacon headers linking that block to a checkpoint the checkpoint
//!    light client already stores

use std::sync::Arc;

use alloy_primitives::B256;
use ferry_core::{
    build_receipt_proof, reduce_block, verify_header_chain, BlockInclusionProof, ProofResult,
    ReceiptEnvelope, TransactionReceipt,
};
use tracing::{debug, info};

use crate::beacon::BeaconClient;
use crate::checkpoint::CheckpointClient;
use crate::error::{Error, Result};
use crate::execution::ExecutionClient;
use crate::proxy::HistoricalProxy;

pub struct ProofComposer {
    execution: Arc<dyn ExecutionClient>,
    beacon: Arc<dyn BeaconClient>,
    proxy: Arc<dyn HistoricalProxy>,
    checkpoints: CheckpointClient,
    seconds_per_slot: u64,
}

impl ProofComposer {
    pub fn new(
        execution: Arc<dyn ExecutionClient>,
        beacon: Arc<dyn BeaconClient>,
        proxy: Arc<dyn HistoricalProxy>,
        checkpoints: CheckpointClient,
        seconds_per_slot: u64,
    ) -> Self {
        Self {
            execution,
            beacon,
            proxy,
            checkpoints,
            seconds_per_slot,
        }
    }

    /// Compose the proof for the receipt of `tx_hash`.
    ///
    /// With `wait` set, blocks until the checkpoint client stores a
    /// checkpoint at or after the transaction's slot.
    pub async fn compose(&self, tx_hash: B256, wait: bool) -> Result<ProofResult> {
        let receipt = self
            .execution
            .transaction_receipt(tx_hash)
            .await?
            .ok_or(Error::TransactionNotFound(tx_hash))?;
        let block_hash = B256::from(receipt.block_hash);
        let block = self
            .execution
            .block_by_hash(block_hash)
            .await?
            .ok_or_else(|| Error::BlockNotFound(block_hash.to_string()))?;

        let receipts = self.execution.block_receipts(&block).await?;
        let envelopes = ordered_envelopes(block_hash, block.transactions.len(), receipts)?;
        let trie = build_receipt_proof(&envelopes, receipt.transaction_index, &block.receipts_root)?;
        debug!(
            %tx_hash,
            index = receipt.transaction_index,
            nodes = trie.nodes.len(),
            "built receipt proof"
        );

        let slot = self.beacon.slot_of(block.timestamp, self.seconds_per_slot).await?;
        let endpoint = self.proxy.endpoint_for(slot).await?;
        let checkpoint_client = self.proxy.checkpoint_client_address(endpoint).await?;
        debug!(slot, %endpoint, %checkpoint_client, "resolved event client");

        let (checkpoint_slot, checkpoint_root) = self
            .checkpoints
            .checkpoint_for(checkpoint_client, slot, wait)
            .await?;

        let beacon_block = self.beacon.block(slot).await?;
        let payload = &beacon_block.body.execution_payload;
        if payload.block_hash != block.hash || payload.receipts_root != block.receipts_root {
            return Err(Error::PayloadMismatch {
                slot,
                block_hash,
                receipts_root: B256::from(block.receipts_root),
                payload_block_hash: B256::from(payload.block_hash),
                payload_receipts_root: B256::from(payload.receipts_root),
            });
        }
        let reduced = reduce_block(&beacon_block);
        let headers = if checkpoint_slot == slot {
            Vec::new()
        } else {
            self.beacon.request_headers(slot + 1, checkpoint_slot).await?
        };
        verify_header_chain(&reduced, &headers, &checkpoint_root.0)?;

        info!(
            %tx_hash,
            slot,
            checkpoint_slot,
            headers = headers.len(),
            "composed proof"
        );

        Ok(ProofResult {
            proof_block: BlockInclusionProof {
                block: reduced,
                headers,
            },
            transaction_index: receipt.transaction_index,
            receipt_rlp: trie.receipt_rlp(),
            proof: trie.nodes,
        })
    }
}

/// Envelopes in transaction order, checked to cover every transaction.
fn ordered_envelopes(
    block: B256,
    expected: usize,
    mut receipts: Vec<TransactionReceipt>,
) -> Result<Vec<ReceiptEnvelope>> {
    receipts.sort_by_key(|r| r.transaction_index);
    let contiguous = receipts
        .iter()
        .enumerate()
        .all(|(i, r)| r.transaction_index == i as u64);
    if receipts.len() != expected || !contiguous {
        return Err(Error::IncompleteReceipts {
            block,
            expected,
            actual: receipts.len(),
        });
    }
    Ok(receipts.into_iter().map(|r| r.envelope).collect())
}
