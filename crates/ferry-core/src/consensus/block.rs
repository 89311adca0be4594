use tree_hash::TreeHash;

use crate::types::beacon::*;
use crate::types::light;
use crate::types::ssz::root_of;

/// Reduce a full beacon block to the representation the Vara light client
/// verifies.
///
/// Every body field except the execution payload is replaced by its hash
/// tree root; the payload keeps its scalar fields and has only the logs
/// bloom, transactions and withdrawals hashed.
pub fn reduce_block(block: &BeaconBlock) -> light::BlockGenericForBlockBody {
    let body = &block.body;

    light::BlockGenericForBlockBody {
        slot: block.slot,
        proposer_index: block.proposer_index,
        parent_root: block.parent_root,
        state_root: block.state_root,
        body: light::BlockBody {
            randao_reveal: root_of(&body.randao_reveal),
            eth1_data: root_of(&body.eth1_data),
            graffiti: body.graffiti,
            proposer_slashings: root_of(&body.proposer_slashings),
            attester_slashings: root_of(&body.attester_slashings),
            attestations: root_of(&body.attestations),
            deposits: root_of(&body.deposits),
            voluntary_exits: root_of(&body.voluntary_exits),
            sync_aggregate: root_of(&body.sync_aggregate),
            execution_payload: reduce_execution_payload(&body.execution_payload),
            bls_to_execution_changes: root_of(&body.bls_to_execution_changes),
            blob_kzg_commitments: root_of(&body.blob_kzg_commitments),
            execution_requests: root_of(&body.execution_requests),
        },
    }
}

/// Hash tree root of a reduced block. Equal to the beacon block root.
pub fn hash_reduced_block(block: &light::BlockGenericForBlockBody) -> [u8; 32] {
    root_of(block)
}

/// Hash a beacon block header using SSZ hash_tree_root.
/// A block and its header share the same root.
pub fn hash_block_header(header: &BlockHeader) -> [u8; 32] {
    root_of(header)
}

/// Root of a full beacon block, merkleized field by field from the full body.
pub fn hash_beacon_block(block: &BeaconBlock) -> [u8; 32] {
    block.tree_hash_root().0
}

/// Body root of a reduced block.
pub fn hash_reduced_body(body: &light::BlockBody) -> [u8; 32] {
    root_of(body)
}

fn reduce_execution_payload(payload: &ExecutionPayload) -> light::ExecutionPayload {
    light::ExecutionPayload {
        parent_hash: payload.parent_hash,
        fee_recipient: payload.fee_recipient,
        state_root: payload.state_root,
        receipts_root: payload.receipts_root,
        logs_bloom: root_of(&payload.logs_bloom),
        prev_randao: payload.prev_randao,
        block_number: payload.block_number,
        gas_limit: payload.gas_limit,
        gas_used: payload.gas_used,
        timestamp: payload.timestamp,
        extra_data: payload.extra_data.clone().into(),
        base_fee_per_gas: payload.base_fee_per_gas,
        block_hash: payload.block_hash,
        transactions: root_of(&payload.transactions),
        withdrawals: root_of(&payload.withdrawals),
        blob_gas_used: payload.blob_gas_used,
        excess_blob_gas: payload.excess_blob_gas,
    }
}
