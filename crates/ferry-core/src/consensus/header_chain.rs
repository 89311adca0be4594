use thiserror::Error;

use crate::consensus::block::{hash_block_header, hash_reduced_block};
use crate::types::beacon::BlockHeader;
use crate::types::light::BlockGenericForBlockBody;

/// Errors raised when a header chain does not connect a block to its checkpoint.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderChainError {
    #[error("Header at slot {slot} does not extend the previous block: parent {parent_root}, expected {expected}")]
    BrokenLink {
        slot: u64,
        parent_root: String,
        expected: String,
    },

    #[error("Header slots must ascend: {previous} followed by {slot}")]
    NotAscending { previous: u64, slot: u64 },

    #[error("Chain ends at slot {slot} with root {computed}, checkpoint root is {expected}")]
    CheckpointMismatch {
        slot: u64,
        computed: String,
        expected: String,
    },
}

/// Check that `headers` link `block` to the trusted checkpoint root.
///
/// Each header's `parent_root` must equal the root of the block or header
/// before it, slots must strictly ascend, and the last root in the chain
/// (the block itself when `headers` is empty) must equal `checkpoint_root`.
pub fn verify_header_chain(
    block: &BlockGenericForBlockBody,
    headers: &[BlockHeader],
    checkpoint_root: &[u8; 32],
) -> Result<(), HeaderChainError> {
    let mut previous_root = hash_reduced_block(block);
    let mut previous_slot = block.slot;

    for header in headers {
        if header.slot <= previous_slot {
            return Err(HeaderChainError::NotAscending {
                previous: previous_slot,
                slot: header.slot,
            });
        }
        if header.parent_root != previous_root {
            return Err(HeaderChainError::BrokenLink {
                slot: header.slot,
                parent_root: hex::encode(header.parent_root),
                expected: hex::encode(previous_root),
            });
        }
        previous_root = hash_block_header(header);
        previous_slot = header.slot;
    }

    if previous_root != *checkpoint_root {
        return Err(HeaderChainError::CheckpointMismatch {
            slot: previous_slot,
            computed: hex::encode(previous_root),
            expected: hex::encode(checkpoint_root),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::block::reduce_block;
    use crate::consensus::block::tests::sample_block;

    fn chain_from(block: &BlockGenericForBlockBody, slots: &[u64]) -> Vec<BlockHeader> {
        let mut parent = hash_reduced_block(block);
        slots
            .iter()
            .map(|&slot| {
                let header = BlockHeader {
                    slot,
                    proposer_index: slot % 100,
                    parent_root: parent,
                    state_root: [slot as u8; 32],
                    body_root: [0xB0; 32],
                };
                parent = hash_block_header(&header);
                header
            })
            .collect()
    }

    #[test]
    fn test_block_is_its_own_checkpoint() {
        let block = reduce_block(&sample_block(100));
        let root = hash_reduced_block(&block);
        assert_eq!(verify_header_chain(&block, &[], &root), Ok(()));
    }

    #[test]
    fn test_chain_with_skipped_slot() {
        let block = reduce_block(&sample_block(100));
        let headers = chain_from(&block, &[101, 102, 104, 105]);
        let checkpoint = hash_block_header(&headers[3]);
        assert_eq!(verify_header_chain(&block, &headers, &checkpoint), Ok(()));
    }

    #[test]
    fn test_broken_link_detected() {
        let block = reduce_block(&sample_block(100));
        let mut headers = chain_from(&block, &[101, 102, 103]);
        let checkpoint = hash_block_header(&headers[2]);
        headers[1].parent_root = [0xFF; 32];
        assert!(matches!(
            verify_header_chain(&block, &headers, &checkpoint),
            Err(HeaderChainError::BrokenLink { slot: 102, .. })
        ));
    }

    #[test]
    fn test_wrong_checkpoint_root() {
        let block = reduce_block(&sample_block(100));
        let headers = chain_from(&block, &[101]);
        assert!(matches!(
            verify_header_chain(&block, &headers, &[0u8; 32]),
            Err(HeaderChainError::CheckpointMismatch { slot: 101, .. })
        ));
    }

    #[test]
    fn test_descending_headers_rejected() {
        let block = reduce_block(&sample_block(100));
        let headers = chain_from(&block, &[99]);
        let checkpoint = hash_block_header(&headers[0]);
        assert_eq!(
            verify_header_chain(&block, &headers, &checkpoint),
            Err(HeaderChainError::NotAscending { previous: 100, slot: 99 })
        );
    }
}
