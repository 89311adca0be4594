//! In-memory chain fixtures for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{SolError, SolEvent};
use async_trait::async_trait;
use ferry_core::types::beacon::*;
use ferry_core::types::bridge::{CrossChainMessage, MerkleInclusionProof};
use ferry_core::types::ssz::{BitVector, VariableList};
use ferry_core::{
    hash_block_header, hash_reduced_block, hash_reduced_body, receipts_root, reduce_block,
    ExecutionBlock, Log, ReceiptEnvelope, TransactionReceipt, TxType,
};
use futures::{future, stream, stream::BoxStream, FutureExt, StreamExt};

use crate::beacon::BeaconClient;
use crate::checkpoint::{
    CheckpointClient, CheckpointError, CheckpointSource, CheckpointState, NewCheckpoint,
};
use crate::composer::ProofComposer;
use crate::error::{Error, Result};
use crate::execution::ExecutionClient;
use crate::gear::{GearChain, ProgramQuery};
use crate::message_queue::{
    revert_reason, IMessageQueue, MerkleRootLog, MessageQueue, ProcessMessage, TransactionOutcome,
};
use crate::proxy::{HistoricalProxy, ProxySubmitter, SentMessage};

pub const GENESIS: u64 = 1_606_824_023;

/// Slot of the beacon block carrying [`FakeExecution`]'s block.
pub const BLOCK_SLOT: u64 = 100;

pub fn message(nonce: u8) -> CrossChainMessage {
    let mut nonce_le = [0u8; 32];
    nonce_le[0] = nonce;
    CrossChainMessage {
        nonce_le,
        source: [0x01; 32],
        destination: [0x02; 20],
        payload: vec![nonce],
    }
}

// ---------------------------------------------------------------------------
// Execution layer
// ---------------------------------------------------------------------------

/// Receipt `index` of `block`; alternates EIP-1559 and legacy transactions.
pub fn receipt_at(block: &ExecutionBlock, index: u64) -> TransactionReceipt {
    let i = index as usize;
    TransactionReceipt {
        transaction_hash: block.transactions[i],
        transaction_index: index,
        block_hash: block.hash,
        block_number: block.number,
        envelope: ReceiptEnvelope {
            tx_type: if i % 2 == 0 { TxType::Eip1559 } else { TxType::Legacy },
            status: true,
            cumulative_gas_used: 21_000 * (index + 1),
            logs_bloom: [0u8; 256],
            logs: vec![Log {
                address: [0x11; 20],
                topics: vec![[index as u8; 32]],
                data: vec![index as u8; 4],
            }],
        },
    }
}

pub struct FakeExecution {
    pub block: ExecutionBlock,
    pub receipts: HashMap<[u8; 32], TransactionReceipt>,
}

impl FakeExecution {
    /// A block of `transactions` receipts, timestamped inside [`BLOCK_SLOT`].
    pub fn with_block(transactions: usize) -> Self {
        let mut block = ExecutionBlock {
            hash: [0xB0; 32],
            number: 21_000_000,
            timestamp: GENESIS + 12 * BLOCK_SLOT + 3,
            receipts_root: [0u8; 32],
            transactions: (0..transactions).map(|i| [i as u8 + 1; 32]).collect(),
        };
        let receipts: Vec<TransactionReceipt> = (0..transactions as u64)
            .map(|i| receipt_at(&block, i))
            .collect();
        let envelopes: Vec<ReceiptEnvelope> = receipts.iter().map(|r| r.envelope.clone()).collect();
        block.receipts_root = receipts_root(&envelopes);

        Self {
            block,
            receipts: receipts
                .into_iter()
                .map(|r| (r.transaction_hash, r))
                .collect(),
        }
    }
}

#[async_trait]
impl ExecutionClient for FakeExecution {
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        Ok(self.receipts.get(&tx_hash.0).cloned())
    }

    async fn block_by_hash(&self, block_hash: B256) -> Result<Option<ExecutionBlock>> {
        Ok((block_hash.0 == self.block.hash).then(|| self.block.clone()))
    }

    async fn latest_block(&self) -> Result<ExecutionBlock> {
        Ok(self.block.clone())
    }
}

// ---------------------------------------------------------------------------
// Consensus layer
// ---------------------------------------------------------------------------

fn beacon_block(slot: u64) -> BeaconBlock {
    BeaconBlock {
        slot,
        proposer_index: 321,
        parent_root: [0xA0; 32],
        state_root: [0xA1; 32],
        body: BeaconBlockBody {
            randao_reveal: [0xA2; 96],
            eth1_data: Eth1Data {
                deposit_root: [0xA3; 32],
                deposit_count: 77,
                block_hash: [0xA4; 32],
            },
            graffiti: [0xA5; 32],
            proposer_slashings: VariableList::empty(),
            attester_slashings: VariableList::empty(),
            attestations: VariableList::empty(),
            deposits: VariableList::empty(),
            voluntary_exits: VariableList::empty(),
            sync_aggregate: SyncAggregate {
                sync_committee_bits: BitVector::from_bytes(vec![0xFF; 64].into()).unwrap(),
                sync_committee_signature: [0xA6; 96],
            },
            execution_payload: ExecutionPayload {
                parent_hash: [0xA7; 32],
                fee_recipient: [0xA8; 20],
                state_root: [0xA9; 32],
                receipts_root: [0xAA; 32],
                logs_bloom: [0u8; 256],
                prev_randao: [0xAB; 32],
                block_number: 21_000_000,
                gas_limit: 36_000_000,
                gas_used: 63_000,
                timestamp: GENESIS + 12 * slot,
                extra_data: VariableList::new(b"fixture".to_vec()).unwrap(),
                base_fee_per_gas: [0u8; 32],
                block_hash: [0xB0; 32],
                transactions: VariableList::new(vec![
                    VariableList::new(vec![0x02, 0x01]).unwrap(),
                    VariableList::new(vec![0x03]).unwrap(),
                ])
                .unwrap(),
                withdrawals: VariableList::empty(),
                blob_gas_used: 0,
                excess_blob_gas: 0,
            },
            bls_to_execution_changes: VariableList::empty(),
            blob_kzg_commitments: VariableList::empty(),
            execution_requests: ExecutionRequests::default(),
        },
    }
}

/// Beacon chain with a full block at its first slot followed by linked
/// headers for the next 16 slots.
pub struct FakeBeacon {
    pub genesis: u64,
    block: BeaconBlock,
    headers: BTreeMap<u64, BlockHeader>,
}

impl FakeBeacon {
    pub fn chain(start: u64, skipped: &[u64]) -> Self {
        Self::linked(beacon_block(start), skipped)
    }

    /// Chain whose block at [`BLOCK_SLOT`] carries `execution` as its payload.
    pub fn carrying(execution: &ExecutionBlock, skipped: &[u64]) -> Self {
        let mut block = beacon_block(BLOCK_SLOT);
        let payload = &mut block.body.execution_payload;
        payload.block_hash = execution.hash;
        payload.receipts_root = execution.receipts_root;
        payload.block_number = execution.number;
        payload.timestamp = execution.timestamp;
        Self::linked(block, skipped)
    }

    fn linked(block: BeaconBlock, skipped: &[u64]) -> Self {
        let start = block.slot;
        let reduced = reduce_block(&block);

        let mut headers = BTreeMap::new();
        headers.insert(start, block.header(hash_reduced_body(&reduced.body)));
        let mut parent_root = hash_reduced_block(&reduced);
        for slot in (start + 1..=start + 16).filter(|s| !skipped.contains(s)) {
            let header = BlockHeader {
                slot,
                proposer_index: slot * 3,
                parent_root,
                state_root: [slot as u8; 32],
                body_root: [0x42; 32],
            };
            parent_root = hash_block_header(&header);
            headers.insert(slot, header);
        }

        Self {
            genesis: GENESIS,
            block,
            headers,
        }
    }

    /// Block root at `slot`.
    pub fn root_at(&self, slot: u64) -> B256 {
        B256::from(hash_block_header(&self.headers[&slot]))
    }
}

#[async_trait]
impl BeaconClient for FakeBeacon {
    async fn genesis_time(&self) -> Result<u64> {
        Ok(self.genesis)
    }

    async fn block_header(&self, slot: u64) -> Result<Option<BlockHeader>> {
        Ok(self.headers.get(&slot).cloned())
    }

    async fn block(&self, slot: u64) -> Result<BeaconBlock> {
        if slot == self.block.slot {
            Ok(self.block.clone())
        } else {
            Err(Error::BlockNotFound(format!("beacon block {slot}")))
        }
    }

    async fn block_by_root(&self, root: [u8; 32]) -> Result<BeaconBlock> {
        let slot = self.block.slot;
        if B256::from(root) == self.root_at(slot) {
            Ok(self.block.clone())
        } else {
            Err(Error::BlockNotFound(format!("beacon block 0x{}", hex::encode(root))))
        }
    }
}

// ---------------------------------------------------------------------------
// Vara programs
// ---------------------------------------------------------------------------

/// Canned replies keyed by program and exact request payload.
#[derive(Default)]
pub struct FakePrograms {
    replies: HashMap<(B256, Vec<u8>), Vec<u8>>,
}

impl FakePrograms {
    pub fn with(mut self, program: B256, request: Vec<u8>, reply: Vec<u8>) -> Self {
        self.replies.insert((program, request), reply);
        self
    }
}

#[async_trait]
impl ProgramQuery for FakePrograms {
    async fn query(&self, program: B256, payload: Vec<u8>) -> Result<Vec<u8>> {
        self.replies
            .get(&(program, payload))
            .cloned()
            .ok_or_else(|| Error::Program {
                program,
                reason: "unexpected request".into(),
            })
    }
}

/// Checkpoint program storing the given slots.
pub struct FakeCheckpoints {
    stored: Mutex<BTreeMap<u64, B256>>,
    upcoming: Vec<u64>,
    on_subscribe: Vec<u64>,
    subscriptions: AtomicUsize,
}

impl FakeCheckpoints {
    pub fn new(slots: &[u64]) -> Self {
        Self {
            stored: Mutex::new(slots.iter().map(|&s| (s, Self::root(s))).collect()),
            upcoming: Vec::new(),
            on_subscribe: Vec::new(),
            subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn root(slot: u64) -> B256 {
        B256::from(U256::from(slot))
    }

    pub fn with_checkpoint(self, slot: u64, root: B256) -> Self {
        self.stored.lock().unwrap().insert(slot, root);
        self
    }

    /// Checkpoints announced on the subscription stream but never stored.
    pub fn with_upcoming(mut self, slots: &[u64]) -> Self {
        self.upcoming = slots.to_vec();
        self
    }

    /// Checkpoints stored while the subscription is being opened; they are
    /// not announced on the stream.
    pub fn with_stored_on_subscribe(mut self, slots: &[u64]) -> Self {
        self.on_subscribe = slots.to_vec();
        self
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointSource for FakeCheckpoints {
    async fn checkpoint_for(
        &self,
        _program: B256,
        slot: u64,
    ) -> Result<std::result::Result<(u64, B256), CheckpointError>> {
        let stored = self.stored.lock().unwrap();
        if stored.keys().next().is_some_and(|&oldest| slot < oldest) {
            return Ok(Err(CheckpointError::OutDated));
        }
        Ok(stored
            .range(slot..)
            .next()
            .map(|(&s, &root)| (s, root))
            .ok_or(CheckpointError::NotPresent))
    }

    async fn latest_state(&self, _program: B256) -> Result<CheckpointState> {
        let stored = self.stored.lock().unwrap();
        Ok(CheckpointState {
            checkpoints: stored.iter().next_back().map(|(&s, r)| (s, r.0)).into_iter().collect(),
            replay_back: None,
        })
    }

    async fn new_checkpoints(
        &self,
        _program: B256,
    ) -> Result<BoxStream<'static, Result<NewCheckpoint>>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        {
            let mut stored = self.stored.lock().unwrap();
            for &slot in &self.on_subscribe {
                stored.insert(slot, Self::root(slot));
            }
        }
        let events = self.upcoming.clone().into_iter().map(|slot| {
            Ok(NewCheckpoint {
                slot,
                tree_hash_root: Self::root(slot),
            })
        });
        Ok(stream::iter(events).boxed())
    }
}

pub struct FakeProxy {
    pub endpoint: B256,
    pub checkpoint_client: B256,
}

impl Default for FakeProxy {
    fn default() -> Self {
        Self {
            endpoint: B256::repeat_byte(0xE1),
            checkpoint_client: B256::repeat_byte(0xC1),
        }
    }
}

#[async_trait]
impl HistoricalProxy for FakeProxy {
    async fn endpoint_for(&self, _slot: u64) -> Result<B256> {
        Ok(self.endpoint)
    }

    async fn checkpoint_client_address(&self, endpoint: B256) -> Result<B256> {
        if endpoint == self.endpoint {
            Ok(self.checkpoint_client)
        } else {
            Err(Error::Program {
                program: endpoint,
                reason: "not an event client".into(),
            })
        }
    }
}

/// Submitter whose messages are included at once and answered with `reply`.
pub struct FakeSubmitter {
    reply: Vec<u8>,
    gas: Option<u64>,
    sent: Mutex<Vec<(B256, Vec<u8>, u64)>>,
}

impl FakeSubmitter {
    pub fn replying(reply: Vec<u8>) -> Self {
        Self {
            reply,
            gas: Some(1_000_000),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_gas() -> Self {
        Self {
            gas: None,
            ..Self::replying(Vec::new())
        }
    }

    pub fn sent(&self) -> Vec<(B256, Vec<u8>, u64)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProxySubmitter for FakeSubmitter {
    async fn calculate_gas(&self, program: B256, _payload: &[u8]) -> Result<u64> {
        self.gas.ok_or_else(|| Error::Program {
            program,
            reason: "ran out of gas".into(),
        })
    }

    async fn send(&self, program: B256, payload: Vec<u8>, gas_limit: u64) -> Result<SentMessage> {
        self.sent.lock().unwrap().push((program, payload, gas_limit));
        Ok(SentMessage {
            block_hash: B256::repeat_byte(0xB1),
            message_id: B256::repeat_byte(0xB2),
            tx_hash: B256::repeat_byte(0xB3),
            reply: future::ready(Ok(self.reply.clone())).boxed(),
            finalized: future::ready(Ok(true)).boxed(),
        })
    }
}

/// A composer whose transaction sits at [`BLOCK_SLOT`] and whose checkpoint
/// client trusts `checkpoint`.
pub fn composer_with_checkpoint(checkpoint: u64) -> (ProofComposer, B256) {
    let execution = FakeExecution::with_block(3);
    let tx_hash = B256::from(execution.block.transactions[1]);
    let beacon = FakeBeacon::carrying(&execution.block, &[]);
    let checkpoints =
        FakeCheckpoints::new(&[]).with_checkpoint(checkpoint, beacon.root_at(checkpoint));
    let composer = ProofComposer::new(
        Arc::new(execution),
        Arc::new(beacon),
        Arc::new(FakeProxy::default()),
        CheckpointClient::new(Arc::new(checkpoints)),
        12,
    );
    (composer, tx_hash)
}

// ---------------------------------------------------------------------------
// Vara chain
// ---------------------------------------------------------------------------

/// Vara blocks with a timestamp, an authority set and optionally a message
/// tree proof.
#[derive(Default)]
pub struct FakeGear {
    blocks: HashMap<u64, (u64, u64)>,
    proofs: HashMap<B256, MerkleInclusionProof>,
}

impl FakeGear {
    pub fn hash(number: u64) -> B256 {
        let mut hash = [0x6A; 32];
        hash[24..].copy_from_slice(&number.to_be_bytes());
        B256::from(hash)
    }

    pub fn with_block(mut self, number: u64, timestamp_ms: u64, authority_set_id: u64) -> Self {
        self.blocks.insert(number, (timestamp_ms, authority_set_id));
        self
    }

    pub fn with_proof(mut self, number: u64, proof: MerkleInclusionProof) -> Self {
        self.proofs.insert(Self::hash(number), proof);
        self
    }

    fn block(&self, hash: B256) -> Result<(u64, u64)> {
        self.blocks
            .iter()
            .find(|(number, _)| Self::hash(**number) == hash)
            .map(|(_, block)| *block)
            .ok_or_else(|| Error::BlockNotFound(format!("Vara block {hash}")))
    }
}

#[async_trait]
impl GearChain for FakeGear {
    async fn block_hash(&self, number: u64) -> Result<B256> {
        if self.blocks.contains_key(&number) {
            Ok(Self::hash(number))
        } else {
            Err(Error::BlockNotFound(format!("Vara block #{number}")))
        }
    }

    async fn block_timestamp_ms(&self, block: B256) -> Result<u64> {
        Ok(self.block(block)?.0)
    }

    async fn authority_set_id(&self, block: B256) -> Result<u64> {
        Ok(self.block(block)?.1)
    }

    async fn merkle_proof(
        &self,
        block: B256,
        _message_hash: B256,
    ) -> Result<Option<MerkleInclusionProof>> {
        Ok(self.proofs.get(&block).cloned())
    }
}

// ---------------------------------------------------------------------------
// Message queue
// ---------------------------------------------------------------------------

/// Message queue contract that processes every message it is sent.
#[derive(Default)]
pub struct FakeQueue {
    roots: HashMap<u64, B256>,
    logs: Vec<MerkleRootLog>,
    upcoming: Vec<MerkleRootLog>,
    processed: HashSet<U256>,
    silent: bool,
    subscriptions: AtomicUsize,
    subscribed_from: Mutex<Option<Option<u64>>>,
    scanned: Mutex<Option<(u64, u64)>>,
    sends: AtomicUsize,
    last_call: Mutex<Option<ProcessMessage>>,
}

impl FakeQueue {
    pub fn with_root(mut self, block_number: u64, root: B256) -> Self {
        self.roots.insert(block_number, root);
        self
    }

    pub fn with_logs(mut self, logs: &[MerkleRootLog]) -> Self {
        self.logs = logs.to_vec();
        self
    }

    pub fn with_upcoming(mut self, logs: &[MerkleRootLog]) -> Self {
        self.upcoming = logs.to_vec();
        self
    }

    pub fn with_processed(mut self, nonce: U256) -> Self {
        self.processed.insert(nonce);
        self
    }

    /// Mined transactions emit no `MessageProcessed` event.
    pub fn without_events(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn subscribed_from(&self) -> Option<Option<u64>> {
        *self.subscribed_from.lock().unwrap()
    }

    /// Ethereum block range of the last log scan.
    pub fn scanned(&self) -> Option<(u64, u64)> {
        *self.scanned.lock().unwrap()
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<ProcessMessage> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn merkle_root(&self, block_number: u64) -> Result<Option<B256>> {
        Ok(self.roots.get(&block_number).copied())
    }

    async fn merkle_root_logs(&self, from: u64, to: u64) -> Result<Vec<MerkleRootLog>> {
        *self.scanned.lock().unwrap() = Some((from, to));
        Ok(self.logs.clone())
    }

    async fn merkle_root_events(
        &self,
        from: Option<u64>,
    ) -> Result<BoxStream<'static, Result<MerkleRootLog>>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        *self.subscribed_from.lock().unwrap() = Some(from);
        Ok(stream::iter(self.upcoming.clone().into_iter().map(Ok)).boxed())
    }

    async fn is_processed(&self, nonce: U256) -> Result<bool> {
        Ok(self.processed.contains(&nonce))
    }

    async fn simulate_process_message(&self, call: &ProcessMessage) -> Result<()> {
        let nonce = call.message.contract_nonce();
        if self.processed.contains(&nonce) {
            let data = IMessageQueue::MessageAlreadyProcessed {
                messageNonce: nonce,
            }
            .abi_encode();
            return Err(Error::Reverted(revert_reason(&data)));
        }
        Ok(())
    }

    async fn send_process_message(&self, call: &ProcessMessage) -> Result<B256> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some(call.clone());
        Ok(B256::repeat_byte(0x7A))
    }

    async fn transaction_outcome(&self, _tx_hash: B256) -> Result<TransactionOutcome> {
        let call = self.last_call();
        let logs = match call.filter(|_| !self.silent) {
            Some(call) => {
                let event = IMessageQueue::MessageProcessed {
                    blockNumber: U256::from(call.block_number),
                    messageHash: B256::from(call.message.hash()),
                    messageNonce: call.message.contract_nonce(),
                    messageDestination: Address::from(call.message.destination),
                };
                vec![Log {
                    address: [0x51; 20],
                    topics: vec![IMessageQueue::MessageProcessed::SIGNATURE_HASH.0],
                    data: event.encode_data(),
                }]
            }
            None => Vec::new(),
        };
        Ok(TransactionOutcome {
            block_number: 2_000,
            status: true,
            logs,
        })
    }
}
