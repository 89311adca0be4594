//! Reduced block representation accepted by the Vara light client.
//!
//! Every top-level body field is replaced by its hash tree root, except the
//! execution payload, which keeps its scalar fields so the verifier can read
//! `receipts_root` and `block_number` directly. Hashing the reduced form
//! yields the same root as hashing the full block.

use codec::{Decode, Encode, Input, Output};

use super::beacon::MaxExtraDataBytes;
use super::ssz::{tree_hash_container, TreeHash, VariableList};

/// Payload `extra_data`, at most 32 bytes.
///
/// SCALE encodes like `Vec<u8>`; decoding rejects anything longer than the
/// SSZ limit, so a reduced payload always has a well defined root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraData(VariableList<u8, MaxExtraDataBytes>);

impl ExtraData {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<VariableList<u8, MaxExtraDataBytes>> for ExtraData {
    fn from(bytes: VariableList<u8, MaxExtraDataBytes>) -> Self {
        Self(bytes)
    }
}

impl Encode for ExtraData {
    fn size_hint(&self) -> usize {
        self.as_bytes().size_hint()
    }

    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        self.as_bytes().encode_to(dest)
    }
}

impl Decode for ExtraData {
    fn decode<I: Input>(input: &mut I) -> Result<Self, codec::Error> {
        let bytes = Vec::<u8>::decode(input)?;
        VariableList::new(bytes)
            .map(Self)
            .map_err(|_| "extra_data is longer than 32 bytes".into())
    }
}

impl TreeHash for ExtraData {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        VariableList::<u8, MaxExtraDataBytes>::tree_hash_type()
    }

    fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
        self.0.tree_hash_packed_encoding()
    }

    fn tree_hash_packing_factor() -> usize {
        VariableList::<u8, MaxExtraDataBytes>::tree_hash_packing_factor()
    }

    fn tree_hash_root(&self) -> tree_hash::Hash256 {
        self.0.tree_hash_root()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct ExecutionPayload {
    pub parent_hash: [u8; 32],
    pub fee_recipient: [u8; 20],
    pub state_root: [u8; 32],
    pub receipts_root: [u8; 32],
    /// Hash tree root of the 256-byte logs bloom.
    pub logs_bloom: [u8; 32],
    pub prev_randao: [u8; 32],
    pub block_number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: ExtraData,
    /// uint256, 32 bytes little-endian.
    pub base_fee_per_gas: [u8; 32],
    pub block_hash: [u8; 32],
    /// Hash tree root of the transactions list.
    pub transactions: [u8; 32],
    /// Hash tree root of the withdrawals list.
    pub withdrawals: [u8; 32],
    pub blob_gas_used: u64,
    pub excess_blob_gas: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct BlockBody {
    pub randao_reveal: [u8; 32],
    pub eth1_data: [u8; 32],
    pub graffiti: [u8; 32],
    pub proposer_slashings: [u8; 32],
    pub attester_slashings: [u8; 32],
    pub attestations: [u8; 32],
    pub deposits: [u8; 32],
    pub voluntary_exits: [u8; 32],
    pub sync_aggregate: [u8; 32],
    pub execution_payload: ExecutionPayload,
    pub bls_to_execution_changes: [u8; 32],
    pub blob_kzg_commitments: [u8; 32],
    pub execution_requests: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct BlockGenericForBlockBody {
    pub slot: u64,
    pub proposer_index: u64,
    pub parent_root: [u8; 32],
    pub state_root: [u8; 32],
    pub body: BlockBody,
}

// A 32-byte field hashes to itself, so the precomputed roots above slot
// straight into the parent container.
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
tree_hash_container!(BlockBody {
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
tree_hash_container!(BlockGenericForBlockBody {
    slot,
    proposer_index,
    parent_root,
    state_root,
    body,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_data_encodes_like_bytes() {
        let extra = ExtraData::from(VariableList::new(b"ferry".to_vec()).unwrap());
        assert_eq!(extra.encode(), b"ferry".to_vec().encode());
        assert_eq!(ExtraData::decode(&mut &extra.encode()[..]).unwrap(), extra);
    }

    #[test]
    fn test_oversized_extra_data_fails_to_decode() {
        let encoded = vec![0u8; 33].encode();
        assert!(ExtraData::decode(&mut &encoded[..]).is_err());

        let encoded = vec![0u8; 32].encode();
        assert_eq!(ExtraData::decode(&mut &encoded[..]).unwrap().as_bytes(), &[0u8; 32]);
    }
}
