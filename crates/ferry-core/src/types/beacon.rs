use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::ssz::{
    tree_hash_container,
    typenum::{
        U1, U1048576, U1073741824, U131072, U16, U2, U32, U33, U4096, U512, U64, U8, U8192,
    },
    BitList, BitVector, FixedVector, VariableList,
};

/// Number of bytes in a BLS12-381 public key (compressed).
pub const BLS_PUBKEY_LEN: usize = 48;

/// Number of bytes in a BLS12-381 signature (compressed).
pub const BLS_SIGNATURE_LEN: usize = 96;

// Electra mainnet preset list limits. Merkleization pads every list to its
// limit, so the typenum bounds below must match the consensus spec exactly.
pub type MaxProposerSlashings = U16;
pub type MaxAttesterSlashings = U1;
pub type MaxAttestations = U8;
pub type MaxDeposits = U16;
pub type MaxVoluntaryExits = U16;
pub type MaxBlsToExecutionChanges = U16;
pub type MaxBlobCommitmentsPerBlock = U4096;
/// MAX_VALIDATORS_PER_COMMITTEE * MAX_COMMITTEES_PER_SLOT.
pub type MaxAttestingValidators = U131072;
pub type MaxCommitteesPerSlot = U64;
pub type SyncCommitteeSize = U512;
pub type DepositProofLen = U33;
pub type MaxExtraDataBytes = U32;
pub type MaxBytesPerTransaction = U1073741824;
pub type MaxTransactionsPerPayload = U1048576;
pub type MaxWithdrawalsPerPayload = U16;
pub type MaxDepositRequestsPerPayload = U8192;
pub type MaxWithdrawalRequestsPerPayload = U16;
pub type MaxConsolidationRequestsPerPayload = U2;

pub const BYTES_PER_LOGS_BLOOM: usize = 256;

/// Opaque EIP-2718 encoded transaction.
pub type Transaction = VariableList<u8, MaxBytesPerTransaction>;

/// A beacon chain block header.
/// This is the light form used to link an unverified slot to a trusted checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct BlockHeader {
    /// Slot number of this block.
    pub slot: u64,
    /// Index of the validator who proposed this block.
    pub proposer_index: u64,
    /// Root hash of the parent beacon block.
    pub parent_root: [u8; 32],
    /// Root hash of the beacon state after processing this block.
    pub state_root: [u8; 32],
    /// Root hash of the block body.
    pub body_root: [u8; 32],
}

/// A full Electra beacon block, as served by `/eth/v2/beacon/blocks/{id}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconBlock {
    pub slot: u64,
    pub proposer_index: u64,
    pub parent_root: [u8; 32],
    pub state_root: [u8; 32],
    pub body: BeaconBlockBody,
}

/// Electra block body. Field order is the SSZ container order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconBlockBody {
    pub randao_reveal: [u8; BLS_SIGNATURE_LEN],
    pub eth1_data: Eth1Data,
    pub graffiti: [u8; 32],
    pub proposer_slashings: VariableList<ProposerSlashing, MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing, MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation, MaxAttestations>,
    pub deposits: VariableList<Deposit, MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, MaxVoluntaryExits>,
    pub sync_aggregate: SyncAggregate,
    pub execution_payload: ExecutionPayload,
    pub bls_to_execution_changes:
        VariableList<SignedBlsToExecutionChange, MaxBlsToExecutionChanges>,
    pub blob_kzg_commitments: VariableList<[u8; BLS_PUBKEY_LEN], MaxBlobCommitmentsPerBlock>,
    pub execution_requests: ExecutionRequests,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eth1Data {
    pub deposit_root: [u8; 32],
    pub deposit_count: u64,
    pub block_hash: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedBeaconBlockHeader {
    pub message: BlockHeader,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub epoch: u64,
    pub root: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationData {
    pub slot: u64,
    pub index: u64,
    pub beacon_block_root: [u8; 32],
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedAttestation {
    pub attesting_indices: VariableList<u64, MaxAttestingValidators>,
    pub data: AttestationData,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttesterSlashing {
    pub attestation_1: IndexedAttestation,
    pub attestation_2: IndexedAttestation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attestation {
    pub aggregation_bits: BitList<MaxAttestingValidators>,
    pub data: AttestationData,
    pub signature: [u8; BLS_SIGNATURE_LEN],
    pub committee_bits: BitVector<MaxCommitteesPerSlot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositData {
    pub pubkey: [u8; BLS_PUBKEY_LEN],
    pub withdrawal_credentials: [u8; 32],
    pub amount: u64,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deposit {
    pub proof: FixedVector<[u8; 32], DepositProofLen>,
    pub data: DepositData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoluntaryExit {
    pub epoch: u64,
    pub validator_index: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedVoluntaryExit {
    pub message: VoluntaryExit,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncAggregate {
    pub sync_committee_bits: BitVector<SyncCommitteeSize>,
    pub sync_committee_signature: [u8; BLS_SIGNATURE_LEN],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: [u8; 20],
    pub amount: u64,
}

/// Deneb/Electra execution payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPayload {
    pub parent_hash: [u8; 32],
    pub fee_recipient: [u8; 20],
    pub state_root: [u8; 32],
    pub receipts_root: [u8; 32],
    pub logs_bloom: [u8; BYTES_PER_LOGS_BLOOM],
    pub prev_randao: [u8; 32],
    pub block_number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: VariableList<u8, MaxExtraDataBytes>,
    /// uint256, little-endian as SSZ stores it.
    pub base_fee_per_gas: [u8; 32],
    pub block_hash: [u8; 32],
    pub transactions: VariableList<Transaction, MaxTransactionsPerPayload>,
    pub withdrawals: VariableList<Withdrawal, MaxWithdrawalsPerPayload>,
    pub blob_gas_used: u64,
    pub excess_blob_gas: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlsToExecutionChange {
    pub validator_index: u64,
    pub from_bls_pubkey: [u8; BLS_PUBKEY_LEN],
    pub to_execution_address: [u8; 20],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedBlsToExecutionChange {
    pub message: BlsToExecutionChange,
    pub signature: [u8; BLS_SIGNATURE_LEN],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositRequest {
    pub pubkey: [u8; BLS_PUBKEY_LEN],
    pub withdrawal_credentials: [u8; 32],
    pub amount: u64,
    pub signature: [u8; BLS_SIGNATURE_LEN],
    pub index: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub source_address: [u8; 20],
    pub validator_pubkey: [u8; BLS_PUBKEY_LEN],
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolidationRequest {
    pub source_address: [u8; 20],
    pub source_pubkey: [u8; BLS_PUBKEY_LEN],
    pub target_pubkey: [u8; BLS_PUBKEY_LEN],
}

/// EIP-7685 requests carried in the Electra block body.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ExecutionRequests {
    pub deposits: VariableList<DepositRequest, MaxDepositRequestsPerPayload>,
    pub withdrawals: VariableList<WithdrawalRequest, MaxWithdrawalRequestsPerPayload>,
    pub consolidations: VariableList<ConsolidationRequest, MaxConsolidationRequestsPerPayload>,
}

impl BeaconBlock {
    /// The light header of this block, given its already computed body root.
    pub fn header(&self, body_root: [u8; 32]) -> BlockHeader {
        BlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root,
        }
    }
}

tree_hash_container!(BlockHeader {
    slot,
    proposer_index,
    parent_root,
    state_root,
    body_root,
});
tree_hash_container!(BeaconBlock {
    slot,
    proposer_index,
    parent_root,
    state_root,
    body,
});
tree_hash_container!(BeaconBlockBody {
    randao_reveal,
    eth1_data,
    graffiti,
    proposer_slashings,
    attester_slashings,
    attestations,
    deposits,
    voluntary_exits,
    sync_aggregate,
    execution_payload,
    bls_to_execution_changes,
    blob_kzg_commitments,
    execution_requests,
});
tree_hash_container!(Eth1Data {
    deposit_root,
    deposit_count,
    block_hash,
});
tree_hash_container!(SignedBeaconBlockHeader { message, signature });
tree_hash_container!(ProposerSlashing {
    signed_header_1,
    signed_header_2,
});
tree_hash_container!(Checkpoint { epoch, root });
tree_hash_container!(AttestationData {
    slot,
    index,
    beacon_block_root,
    source,
    target,
});
tree_hash_container!(IndexedAttestation {
    attesting_indices,
    data,
    signature,
});
tree_hash_container!(AttesterSlashing {
    attestation_1,
    attestation_2,
});
tree_hash_container!(Attestation {
    aggregation_bits,
    data,
    signature,
    committee_bits,
});
tree_hash_container!(DepositData {
    pubkey,
    withdrawal_credentials,
    amount,
    signature,
});
tree_hash_container!(Deposit { proof, data });
tree_hash_container!(VoluntaryExit {
    epoch,
    validator_index,
});
tree_hash_container!(SignedVoluntaryExit { message, signature });
tree_hash_container!(SyncAggregate {
    sync_committee_bits,
    sync_committee_signature,
});
tree_hash_container!(Withdrawal {
    index,
    validator_index,
    address,
    amount,
});
tree_hash_container!(ExecutionPayload {
    parent_hash,
    fee_recipient,
    state_root,
    receipts_root,
    logs_bloom,
    prev_randao,
    block_number,
    gas_limit,
    gas_used,
    timestamp,
    extra_data,
    base_fee_per_gas,
    block_hash,
    transactions,
    withdrawals,
    blob_gas_used,
    excess_blob_gas,
});
tree_hash_container!(BlsToExecutionChange {
    validator_index,
    from_bls_pubkey,
    to_execution_address,
});
tree_hash_container!(SignedBlsToExecutionChange { message, signature });
tree_hash_container!(DepositRequest {
    pubkey,
    withdrawal_credentials,
    amount,
    signature,
    index,
});
tree_hash_container!(WithdrawalRequest {
    source_address,
    validator_pubkey,
    amount,
});
tree_hash_container!(ConsolidationRequest {
    source_address,
    source_pubkey,
    target_pubkey,
});
tree_hash_container!(ExecutionRequests {
    deposits,
    withdrawals,
    consolidations,
});
