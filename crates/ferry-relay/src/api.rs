//! Node JSON format adapters.
//!
//! Beacon REST, Ethereum JSON-RPC and Vara JSON-RPC each use their own JSON
//! conventions. This module defines serde types matching the wire format and
//! converts them into `ferry_core` types.
//!
//! Key differences:
//! - Beacon API uses decimal strings ("12345"), execution RPC uses 0x
//!   quantities ("0x3039"), core uses u64
//! - APIs use 0x-prefixed hex strings, core uses byte arrays
//! - Beacon API wraps everything in { data: {...} } and blocks in
//!   { message: {...}, signature }

use alloy_primitives::U256;
use ferry_core::types::beacon::*;
use ferry_core::types::bridge::MerkleInclusionProof;
use ferry_core::types::execution::*;
use ferry_core::types::ssz::{typenum::Unsigned, BitList, BitVector, FixedVector, VariableList};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Hex conversion helpers
// ---------------------------------------------------------------------------

pub fn hex_to_array<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let bytes = hex_to_bytes(s)?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected {} bytes, got {}", N, bytes.len()))
}

pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| format!("hex decode: {}", e))
}

fn hex_list<const N: usize>(items: &[String]) -> Result<Vec<[u8; N]>, String> {
    items.iter().map(|s| hex_to_array(s)).collect()
}

fn parse_u64_string(s: &str) -> Result<u64, String> {
    s.parse::<u64>().map_err(|e| format!("parse u64: {}", e))
}

/// Parse an execution RPC quantity ("0x1a").
pub fn parse_quantity(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| format!("quantity without 0x prefix: {s}"))?;
    u64::from_str_radix(digits, 16).map_err(|e| format!("parse quantity {s}: {e}"))
}

fn to_core_list<A, T>(items: &[A], f: impl Fn(&A) -> Result<T, String>) -> Result<Vec<T>, String> {
    items.iter().map(f).collect()
}

/// Wrap `items` in an SSZ list, rejecting more than its limit `N`.
fn bounded<T, N: Unsigned>(what: &str, items: Vec<T>) -> Result<VariableList<T, N>, String> {
    let len = items.len();
    VariableList::new(items)
        .map_err(|_| format!("{what}: {len} items exceed the limit of {}", N::to_usize()))
}

// ---------------------------------------------------------------------------
// Beacon API: genesis and headers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct ApiGenesis {
    pub genesis_time: String,
}

impl ApiGenesis {
    pub fn genesis_time(&self) -> Result<u64, String> {
        parse_u64_string(&self.genesis_time)
    }
}

#[derive(Deserialize)]
pub struct ApiHeaderData {
    pub root: String,
    pub header: ApiSigned<ApiBeaconBlockHeader>,
}

#[derive(Deserialize)]
pub struct ApiSigned<T> {
    pub message: T,
    pub signature: String,
}

#[derive(Deserialize)]
pub struct ApiBeaconBlockHeader {
    pub slot: String,
    pub proposer_index: String,
    pub parent_root: String,
    pub state_root: String,
    pub body_root: String,
}

impl ApiBeaconBlockHeader {
    pub fn to_core(&self) -> Result<BlockHeader, String> {
        Ok(BlockHeader {
            slot: parse_u64_string(&self.slot)?,
            proposer_index: parse_u64_string(&self.proposer_index)?,
            parent_root: hex_to_array(&self.parent_root)?,
            state_root: hex_to_array(&self.state_root)?,
            body_root: hex_to_array(&self.body_root)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Beacon API: Electra block
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ApiBeaconBlock {
    pub slot: String,
    pub proposer_index: String,
    pub parent_root: String,
    pub state_root: String,
    pub body: ApiBeaconBlockBody,
}

impl ApiBeaconBlock {
    pub fn to_core(&self) -> Result<BeaconBlock, String> {
        Ok(BeaconBlock {
            slot: parse_u64_string(&self.slot)?,
            proposer_index: parse_u64_string(&self.proposer_index)?,
            parent_root: hex_to_array(&self.parent_root)?,
            state_root: hex_to_array(&self.state_root)?,
            body: self.body.to_core()?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiBeaconBlockBody {
    pub randao_reveal: String,
    pub eth1_data: ApiEth1Data,
    pub graffiti: String,
    pub proposer_slashings: Vec<ApiProposerSlashing>,
    pub attester_slashings: Vec<ApiAttesterSlashing>,
    pub attestations: Vec<ApiAttestation>,
    pub deposits: Vec<ApiDeposit>,
    pub voluntary_exits: Vec<ApiSigned<ApiVoluntaryExit>>,
    pub sync_aggregate: ApiSyncAggregate,
    pub execution_payload: ApiExecutionPayload,
    pub bls_to_execution_changes: Vec<ApiSigned<ApiBlsToExecutionChange>>,
    pub blob_kzg_commitments: Vec<String>,
    pub execution_requests: ApiExecutionRequests,
}

impl ApiBeaconBlockBody {
    pub fn to_core(&self) -> Result<BeaconBlockBody, String> {
        Ok(BeaconBlockBody {
            randao_reveal: hex_to_array(&self.randao_reveal)?,
            eth1_data: self.eth1_data.to_core()?,
            graffiti: hex_to_array(&self.graffiti)?,
            proposer_slashings: bounded(
                "proposer_slashings",
                to_core_list(&self.proposer_slashings, |s| s.to_core())?,
            )?,
            attester_slashings: bounded(
                "attester_slashings",
                to_core_list(&self.attester_slashings, |s| s.to_core())?,
            )?,
            attestations: bounded(
                "attestations",
                to_core_list(&self.attestations, |a| a.to_core())?,
            )?,
            deposits: bounded("deposits", to_core_list(&self.deposits, |d| d.to_core())?)?,
            voluntary_exits: bounded(
                "voluntary_exits",
                to_core_list(&self.voluntary_exits, |e| {
                    Ok(SignedVoluntaryExit {
                        message: e.message.to_core()?,
                        signature: hex_to_array(&e.signature)?,
                    })
                })?,
            )?,
            sync_aggregate: self.sync_aggregate.to_core()?,
            execution_payload: self.execution_payload.to_core()?,
            bls_to_execution_changes: bounded(
                "bls_to_execution_changes",
                to_core_list(&self.bls_to_execution_changes, |c| {
                    Ok(SignedBlsToExecutionChange {
                        message: c.message.to_core()?,
                        signature: hex_to_array(&c.signature)?,
                    })
                })?,
            )?,
            blob_kzg_commitments: bounded(
                "blob_kzg_commitments",
                hex_list(&self.blob_kzg_commitments)?,
            )?,
            execution_requests: self.execution_requests.to_core()?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiEth1Data {
    pub deposit_root: String,
    pub deposit_count: String,
    pub block_hash: String,
}

impl ApiEth1Data {
    pub fn to_core(&self) -> Result<Eth1Data, String> {
        Ok(Eth1Data {
            deposit_root: hex_to_array(&self.deposit_root)?,
            deposit_count: parse_u64_string(&self.deposit_count)?,
            block_hash: hex_to_array(&self.block_hash)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiProposerSlashing {
    pub signed_header_1: ApiSigned<ApiBeaconBlockHeader>,
    pub signed_header_2: ApiSigned<ApiBeaconBlockHeader>,
}

impl ApiProposerSlashing {
    pub fn to_core(&self) -> Result<ProposerSlashing, String> {
        let signed = |h: &ApiSigned<ApiBeaconBlockHeader>| -> Result<_, String> {
            Ok(SignedBeaconBlockHeader {
                message: h.message.to_core()?,
                signature: hex_to_array(&h.signature)?,
            })
        };
        Ok(ProposerSlashing {
            signed_header_1: signed(&self.signed_header_1)?,
            signed_header_2: signed(&self.signed_header_2)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiAttesterSlashing {
    pub attestation_1: ApiIndexedAttestation,
    pub attestation_2: ApiIndexedAttestation,
}

impl ApiAttesterSlashing {
    pub fn to_core(&self) -> Result<AttesterSlashing, String> {
        Ok(AttesterSlashing {
            attestation_1: self.attestation_1.to_core()?,
            attestation_2: self.attestation_2.to_core()?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiIndexedAttestation {
    pub attesting_indices: Vec<String>,
    pub data: ApiAttestationData,
    pub signature: String,
}

impl ApiIndexedAttestation {
    pub fn to_core(&self) -> Result<IndexedAttestation, String> {
        Ok(IndexedAttestation {
            attesting_indices: bounded(
                "attesting_indices",
                to_core_list(&self.attesting_indices, |i| parse_u64_string(i))?,
            )?,
            data: self.data.to_core()?,
            signature: hex_to_array(&self.signature)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiAttestation {
    pub aggregation_bits: String,
    pub data: ApiAttestationData,
    pub signature: String,
    pub committee_bits: String,
}

impl ApiAttestation {
    pub fn to_core(&self) -> Result<Attestation, String> {
        Ok(Attestation {
            aggregation_bits: BitList::from_bytes(hex_to_bytes(&self.aggregation_bits)?.into())
                .map_err(|e| format!("aggregation_bits: {e:?}"))?,
            data: self.data.to_core()?,
            signature: hex_to_array(&self.signature)?,
            committee_bits: BitVector::from_bytes(hex_to_bytes(&self.committee_bits)?.into())
                .map_err(|e| format!("committee_bits: {e:?}"))?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiAttestationData {
    pub slot: String,
    pub index: String,
    pub beacon_block_root: String,
    pub source: ApiCheckpoint,
    pub target: ApiCheckpoint,
}

impl ApiAttestationData {
    pub fn to_core(&self) -> Result<AttestationData, String> {
        Ok(AttestationData {
            slot: parse_u64_string(&self.slot)?,
            index: parse_u64_string(&self.index)?,
            beacon_block_root: hex_to_array(&self.beacon_block_root)?,
            source: self.source.to_core()?,
            target: self.target.to_core()?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiCheckpoint {
    pub epoch: String,
    pub root: String,
}

impl ApiCheckpoint {
    pub fn to_core(&self) -> Result<Checkpoint, String> {
        Ok(Checkpoint {
            epoch: parse_u64_string(&self.epoch)?,
            root: hex_to_array(&self.root)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiDeposit {
    pub proof: Vec<String>,
    pub data: ApiDepositData,
}

impl ApiDeposit {
    pub fn to_core(&self) -> Result<Deposit, String> {
        Ok(Deposit {
            proof: FixedVector::new(hex_list(&self.proof)?)
                .map_err(|e| format!("deposit proof: {e:?}"))?,
            data: self.data.to_core()?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiDepositData {
    pub pubkey: String,
    pub withdrawal_credentials: String,
    pub amount: String,
    pub signature: String,
}

impl ApiDepositData {
    pub fn to_core(&self) -> Result<DepositData, String> {
        Ok(DepositData {
            pubkey: hex_to_array(&self.pubkey)?,
            withdrawal_credentials: hex_to_array(&self.withdrawal_credentials)?,
            amount: parse_u64_string(&self.amount)?,
            signature: hex_to_array(&self.signature)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiVoluntaryExit {
    pub epoch: String,
    pub validator_index: String,
}

impl ApiVoluntaryExit {
    pub fn to_core(&self) -> Result<VoluntaryExit, String> {
        Ok(VoluntaryExit {
            epoch: parse_u64_string(&self.epoch)?,
            validator_index: parse_u64_string(&self.validator_index)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiSyncAggregate {
    pub sync_committee_bits: String,
    pub sync_committee_signature: String,
}

impl ApiSyncAggregate {
    pub fn to_core(&self) -> Result<SyncAggregate, String> {
        Ok(SyncAggregate {
            sync_committee_bits: BitVector::from_bytes(
                hex_to_bytes(&self.sync_committee_bits)?.into(),
            )
            .map_err(|e| format!("sync_committee_bits: {e:?}"))?,
            sync_committee_signature: hex_to_array(&self.sync_committee_signature)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiExecutionPayload {
    pub parent_hash: String,
    pub fee_recipient: String,
    pub state_root: String,
    pub receipts_root: String,
    pub logs_bloom: String,
    pub prev_randao: String,
    pub block_number: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub extra_data: String,
    /// Decimal string of a uint256.
    pub base_fee_per_gas: String,
    pub block_hash: String,
    pub transactions: Vec<String>,
    pub withdrawals: Vec<ApiWithdrawal>,
    pub blob_gas_used: String,
    pub excess_blob_gas: String,
}

impl ApiExecutionPayload {
    pub fn to_core(&self) -> Result<ExecutionPayload, String> {
        let base_fee = U256::from_str_radix(&self.base_fee_per_gas, 10)
            .map_err(|e| format!("parse base_fee_per_gas: {e}"))?;

        Ok(ExecutionPayload {
            parent_hash: hex_to_array(&self.parent_hash)?,
            fee_recipient: hex_to_array(&self.fee_recipient)?,
            state_root: hex_to_array(&self.state_root)?,
            receipts_root: hex_to_array(&self.receipts_root)?,
            logs_bloom: hex_to_array(&self.logs_bloom)?,
            prev_randao: hex_to_array(&self.prev_randao)?,
            block_number: parse_u64_string(&self.block_number)?,
            gas_limit: parse_u64_string(&self.gas_limit)?,
            gas_used: parse_u64_string(&self.gas_used)?,
            timestamp: parse_u64_string(&self.timestamp)?,
            extra_data: bounded("extra_data", hex_to_bytes(&self.extra_data)?)?,
            base_fee_per_gas: base_fee.to_le_bytes::<32>(),
            block_hash: hex_to_array(&self.block_hash)?,
            transactions: bounded(
                "transactions",
                to_core_list(&self.transactions, |t| bounded("transaction", hex_to_bytes(t)?))?,
            )?,
            withdrawals: bounded(
                "withdrawals",
                to_core_list(&self.withdrawals, |w| w.to_core())?,
            )?,
            blob_gas_used: parse_u64_string(&self.blob_gas_used)?,
            excess_blob_gas: parse_u64_string(&self.excess_blob_gas)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiWithdrawal {
    pub index: String,
    pub validator_index: String,
    pub address: String,
    pub amount: String,
}

impl ApiWithdrawal {
    pub fn to_core(&self) -> Result<Withdrawal, String> {
        Ok(Withdrawal {
            index: parse_u64_string(&self.index)?,
            validator_index: parse_u64_string(&self.validator_index)?,
            address: hex_to_array(&self.address)?,
            amount: parse_u64_string(&self.amount)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiBlsToExecutionChange {
    pub validator_index: String,
    pub from_bls_pubkey: String,
    pub to_execution_address: String,
}

impl ApiBlsToExecutionChange {
    pub fn to_core(&self) -> Result<BlsToExecutionChange, String> {
        Ok(BlsToExecutionChange {
            validator_index: parse_u64_string(&self.validator_index)?,
            from_bls_pubkey: hex_to_array(&self.from_bls_pubkey)?,
            to_execution_address: hex_to_array(&self.to_execution_address)?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiExecutionRequests {
    pub deposits: Vec<ApiDepositRequest>,
    pub withdrawals: Vec<ApiWithdrawalRequest>,
    pub consolidations: Vec<ApiConsolidationRequest>,
}

impl ApiExecutionRequests {
    pub fn to_core(&self) -> Result<ExecutionRequests, String> {
        Ok(ExecutionRequests {
            deposits: bounded(
                "deposit_requests",
                to_core_list(&self.deposits, |d| {
                    Ok(DepositRequest {
                        pubkey: hex_to_array(&d.pubkey)?,
                        withdrawal_credentials: hex_to_array(&d.withdrawal_credentials)?,
                        amount: parse_u64_string(&d.amount)?,
                        signature: hex_to_array(&d.signature)?,
                        index: parse_u64_string(&d.index)?,
                    })
                })?,
            )?,
            withdrawals: bounded(
                "withdrawal_requests",
                to_core_list(&self.withdrawals, |w| {
                    Ok(WithdrawalRequest {
                        source_address: hex_to_array(&w.source_address)?,
                        validator_pubkey: hex_to_array(&w.validator_pubkey)?,
                        amount: parse_u64_string(&w.amount)?,
                    })
                })?,
            )?,
            consolidations: bounded(
                "consolidation_requests",
                to_core_list(&self.consolidations, |c| {
                    Ok(ConsolidationRequest {
                        source_address: hex_to_array(&c.source_address)?,
                        source_pubkey: hex_to_array(&c.source_pubkey)?,
                        target_pubkey: hex_to_array(&c.target_pubkey)?,
                    })
                })?,
            )?,
        })
    }
}

#[derive(Deserialize)]
pub struct ApiDepositRequest {
    pub pubkey: String,
    pub withdrawal_credentials: String,
    pub amount: String,
    pub signature: String,
    pub index: String,
}

#[derive(Deserialize)]
pub struct ApiWithdrawalRequest {
    pub source_address: String,
    pub validator_pubkey: String,
    pub amount: String,
}

#[derive(Deserialize)]
pub struct ApiConsolidationRequest {
    pub source_address: String,
    pub source_pubkey: String,
    pub target_pubkey: String,
}

// ---------------------------------------------------------------------------
// Execution RPC: receipts, logs, blocks
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReceipt {
    pub transaction_hash: String,
    pub transaction_index: String,
    pub block_hash: String,
    pub block_number: String,
    /// Absent on nodes that predate EIP-2718.
    #[serde(rename = "type", default)]
    pub tx_type: Option<String>,
    /// Absent on pre-Byzantium receipts, which carry a state root instead.
    #[serde(default)]
    pub status: Option<String>,
    pub cumulative_gas_used: String,
    pub logs_bloom: String,
    pub logs: Vec<ApiLog>,
}

impl ApiReceipt {
    pub fn to_core(&self) -> Result<TransactionReceipt, String> {
        let tx_type = match &self.tx_type {
            Some(t) => {
                let raw = parse_quantity(t)?;
                u8::try_from(raw)
                    .ok()
                    .and_then(|b| TxType::try_from(b).ok())
                    .ok_or_else(|| format!("unsupported transaction type {t}"))?
            }
            None => TxType::Legacy,
        };
        let status = match self.status.as_deref() {
            Some(s) => parse_quantity(s)? == 1,
            None => return Err("pre-Byzantium receipt has no status".into()),
        };

        Ok(TransactionReceipt {
            transaction_hash: hex_to_array(&self.transaction_hash)?,
            transaction_index: parse_quantity(&self.transaction_index)?,
            block_hash: hex_to_array(&self.block_hash)?,
            block_number: parse_quantity(&self.block_number)?,
            envelope: ReceiptEnvelope {
                tx_type,
                status,
                cumulative_gas_used: parse_quantity(&self.cumulative_gas_used)?,
                logs_bloom: hex_to_array(&self.logs_bloom)?,
                logs: to_core_list(&self.logs, |l| l.to_core())?,
            },
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    /// Set for mined logs.
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl ApiLog {
    pub fn to_core(&self) -> Result<Log, String> {
        Ok(Log {
            address: hex_to_array(&self.address)?,
            topics: hex_list(&self.topics)?,
            data: hex_to_bytes(&self.data)?,
        })
    }

    pub fn block_number(&self) -> Result<u64, String> {
        self.block_number
            .as_deref()
            .ok_or_else(|| "pending log has no block number".to_string())
            .and_then(parse_quantity)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBlock {
    pub hash: String,
    pub number: String,
    pub timestamp: String,
    pub receipts_root: String,
    /// Transaction hashes (the block is requested without full transactions).
    pub transactions: Vec<String>,
}

impl ApiBlock {
    pub fn to_core(&self) -> Result<ExecutionBlock, String> {
        Ok(ExecutionBlock {
            hash: hex_to_array(&self.hash)?,
            number: parse_quantity(&self.number)?,
            timestamp: parse_quantity(&self.timestamp)?,
            receipts_root: hex_to_array(&self.receipts_root)?,
            transactions: hex_list(&self.transactions)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Vara RPC: bridge merkle proofs and program replies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ApiMerkleProof {
    pub root: String,
    pub proof: Vec<String>,
    pub number_of_leaves: u64,
    pub leaf_index: u64,
}

impl ApiMerkleProof {
    pub fn to_core(&self) -> Result<MerkleInclusionProof, String> {
        Ok(MerkleInclusionProof {
            root: hex_to_array(&self.root)?,
            leaf_index: self.leaf_index,
            num_leaves: self.number_of_leaves,
            proof: hex_list(&self.proof)?,
        })
    }
}

/// Reply computed by `gear_calculateReplyForHandle`.
#[derive(Deserialize)]
pub struct ApiReplyInfo {
    pub payload: String,
    #[serde(default)]
    pub value: u128,
    /// Reply code as the node renders it, e.g. `{"Success": "Manual"}`.
    pub code: serde_json::Value,
}

impl ApiReplyInfo {
    pub fn is_success(&self) -> bool {
        self.code.get("Success").is_some()
    }

    pub fn payload(&self) -> Result<Vec<u8>, String> {
        hex_to_bytes(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_helpers() {
        assert_eq!(hex_to_array::<2>("0xabcd").unwrap(), [0xAB, 0xCD]);
        assert_eq!(hex_to_array::<2>("abcd").unwrap(), [0xAB, 0xCD]);
        assert!(hex_to_array::<3>("0xabcd").is_err());
        assert!(hex_to_bytes("0xzz").is_err());
        assert_eq!(hex_to_bytes("0x").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert!(parse_quantity("26").is_err());
    }

    #[test]
    fn test_header_response() {
        let json = format!(
            r#"{{"data": {{"root": "0x{r}", "canonical": true, "header": {{
                "message": {{"slot": "123", "proposer_index": "7",
                    "parent_root": "0x{p}", "state_root": "0x{s}", "body_root": "0x{b}"}},
                "signature": "0x00"}}}}}}"#,
            r = "11".repeat(32),
            p = "22".repeat(32),
            s = "33".repeat(32),
            b = "44".repeat(32),
        );
        let response: ApiResponse<ApiHeaderData> = serde_json::from_str(&json).unwrap();
        let header = response.data.header.message.to_core().unwrap();
        assert_eq!(header.slot, 123);
        assert_eq!(header.proposer_index, 7);
        assert_eq!(header.parent_root, [0x22; 32]);
        assert_eq!(header.body_root, [0x44; 32]);
    }

    #[test]
    fn test_receipt_conversion() {
        let json = format!(
            r#"{{
                "transactionHash": "0x{h}",
                "transactionIndex": "0x5",
                "blockHash": "0x{b}",
                "blockNumber": "0x10",
                "type": "0x2",
                "status": "0x1",
                "cumulativeGasUsed": "0x5208",
                "logsBloom": "0x{bloom}",
                "gasUsed": "0x5208",
                "logs": [{{
                    "address": "0x{a}",
                    "topics": ["0x{t}"],
                    "data": "0x0102",
                    "blockNumber": "0x10",
                    "logIndex": "0x0"
                }}]
            }}"#,
            h = "aa".repeat(32),
            b = "bb".repeat(32),
            bloom = "00".repeat(256),
            a = "cc".repeat(20),
            t = "dd".repeat(32),
        );
        let api: ApiReceipt = serde_json::from_str(&json).unwrap();
        let receipt = api.to_core().unwrap();
        assert_eq!(receipt.transaction_index, 5);
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.envelope.tx_type, TxType::Eip1559);
        assert!(receipt.envelope.status);
        assert_eq!(receipt.envelope.cumulative_gas_used, 21_000);
        assert_eq!(receipt.envelope.logs[0].address, [0xCC; 20]);
        assert_eq!(receipt.envelope.logs[0].data, vec![1, 2]);
        assert_eq!(api.logs[0].block_number().unwrap(), 16);
    }

    #[test]
    fn test_receipt_without_status_rejected() {
        let json = format!(
            r#"{{"transactionHash": "0x{h}", "transactionIndex": "0x0",
                "blockHash": "0x{h}", "blockNumber": "0x1", "root": "0x{h}",
                "cumulativeGasUsed": "0x1", "logsBloom": "0x{bloom}", "logs": []}}"#,
            h = "aa".repeat(32),
            bloom = "00".repeat(256),
        );
        let api: ApiReceipt = serde_json::from_str(&json).unwrap();
        assert!(api.to_core().is_err());
    }

    fn payload(extra_data: &str) -> ApiExecutionPayload {
        ApiExecutionPayload {
            parent_hash: format!("0x{}", "00".repeat(32)),
            fee_recipient: format!("0x{}", "00".repeat(20)),
            state_root: format!("0x{}", "00".repeat(32)),
            receipts_root: format!("0x{}", "00".repeat(32)),
            logs_bloom: format!("0x{}", "00".repeat(256)),
            prev_randao: format!("0x{}", "00".repeat(32)),
            block_number: "1".into(),
            gas_limit: "30000000".into(),
            gas_used: "0".into(),
            timestamp: "1700000000".into(),
            extra_data: extra_data.into(),
            base_fee_per_gas: "256".into(),
            block_hash: format!("0x{}", "00".repeat(32)),
            transactions: vec!["0x02f8".into()],
            withdrawals: vec![],
            blob_gas_used: "0".into(),
            excess_blob_gas: "0".into(),
        }
    }

    #[test]
    fn test_base_fee_is_little_endian() {
        let core = payload("0x").to_core().unwrap();
        assert_eq!(&core.base_fee_per_gas[..2], &[0x00, 0x01]);
        assert_eq!(core.transactions.len(), 1);
        assert_eq!(&core.transactions[0][..], &[0x02, 0xF8]);
        assert_eq!(core.gas_limit, 30_000_000);
    }

    #[test]
    fn test_oversized_extra_data_rejected() {
        let max = format!("0x{}", "ab".repeat(32));
        assert_eq!(payload(&max).to_core().unwrap().extra_data.len(), 32);

        let over = format!("0x{}", "ab".repeat(33));
        let err = payload(&over).to_core().unwrap_err();
        assert!(err.contains("extra_data"), "{err}");
    }

    #[test]
    fn test_deposit_proof_must_have_33_nodes() {
        let deposit = |nodes: usize| ApiDeposit {
            proof: vec![format!("0x{}", "11".repeat(32)); nodes],
            data: ApiDepositData {
                pubkey: format!("0x{}", "22".repeat(48)),
                withdrawal_credentials: format!("0x{}", "33".repeat(32)),
                amount: "32000000000".into(),
                signature: format!("0x{}", "44".repeat(96)),
            },
        };
        assert_eq!(deposit(33).to_core().unwrap().proof.len(), 33);
        assert!(deposit(32).to_core().is_err());
    }

    #[test]
    fn test_aggregation_bits_keep_bit_length() {
        let data = ApiAttestationData {
            slot: "1".into(),
            index: "0".into(),
            beacon_block_root: format!("0x{}", "00".repeat(32)),
            source: ApiCheckpoint { epoch: "0".into(), root: format!("0x{}", "00".repeat(32)) },
            target: ApiCheckpoint { epoch: "1".into(), root: format!("0x{}", "00".repeat(32)) },
        };
        let attestation = ApiAttestation {
            // Nine set bits followed by the delimiter.
            aggregation_bits: "0xff03".into(),
            data,
            signature: format!("0x{}", "00".repeat(96)),
            committee_bits: "0x0100000000000000".into(),
        };
        let core = attestation.to_core().unwrap();
        assert_eq!(core.aggregation_bits.len(), 9);
        assert_eq!(core.aggregation_bits.num_set_bits(), 9);
        assert!(core.committee_bits.get(0).unwrap());
    }

    #[test]
    fn test_reply_code() {
        let ok: ApiReplyInfo = serde_json::from_str(
            r#"{"payload": "0x0102", "value": 0, "code": {"Success": "Manual"}}"#,
        )
        .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.payload().unwrap(), vec![1, 2]);

        let err: ApiReplyInfo = serde_json::from_str(
            r#"{"payload": "0x", "value": 0, "code": {"Error": {"Execution": "UserspacePanic"}}}"#,
        )
        .unwrap();
        assert!(!err.is_success());
    }
}
