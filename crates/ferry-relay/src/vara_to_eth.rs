//! Vara to Ethereum relayer.
//!
//! Delivers one queued Vara message to its Ethereum destination:
//!
//! ```text
//! LocatingMessage -> ResolvingAuthorityEpoch -> ResolvingMerkleRoot
//!     -> FetchingProof -> Submitting -> Succeeded | Failed
//! ```
//!
//! Merkle roots are published on Ethereum for some Vara blocks only. When the
//! message's own block has none, a later root signed by the same GRANDPA
//! authority set covers it, and the relay continues against that block.

use std::sync::Arc;

use alloy_primitives::{B256, U256};
use ferry_core::types::bridge::{CrossChainMessage, MerkleInclusionProof};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::execution::ExecutionClient;
use crate::gear::{GearChain, MessageLookup};
use crate::message_queue::{
    find_merkle_root_in_range, process_message, wait_for_merkle_root, MerkleRootLog,
    MessageProcessed, MessageQueue, ProcessMessage,
};

/// Progress reported to the status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    LocatingMessage { block: u64, nonce: U256 },
    ResolvingAuthorityEpoch { block_hash: B256 },
    ResolvingMerkleRoot { block: u64, authority_set_id: u64 },
    FetchingProof { block: u64, merkle_root: B256 },
    Submitting { block: u64, leaf_index: u64, num_leaves: u64 },
    Succeeded { tx_hash: B256 },
    Failed { reason: String },
}

/// The message to relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Vara block the message was queued in.
    pub block: u64,
    pub nonce: U256,
    /// Wait for a merkle root to be published instead of searching the
    /// already published ones.
    pub wait: bool,
}

enum Stage {
    LocatingMessage,
    ResolvingAuthorityEpoch {
        block_hash: B256,
        message: CrossChainMessage,
    },
    ResolvingMerkleRoot {
        block_hash: B256,
        message: CrossChainMessage,
        authority_set_id: u64,
    },
    FetchingProof {
        block: u64,
        block_hash: B256,
        message: CrossChainMessage,
        merkle_root: B256,
    },
    Submitting(ProcessMessage),
}

enum Transition {
    Next(Stage),
    Done(MessageProcessed),
}

pub struct VaraToEthRelayer {
    gear: Arc<dyn GearChain>,
    messages: Arc<dyn MessageLookup>,
    execution: Arc<dyn ExecutionClient>,
    queue: Arc<dyn MessageQueue>,
    eth_block_time_secs: u64,
}

impl VaraToEthRelayer {
    pub fn new(
        gear: Arc<dyn GearChain>,
        messages: Arc<dyn MessageLookup>,
        execution: Arc<dyn ExecutionClient>,
        queue: Arc<dyn MessageQueue>,
        eth_block_time_secs: u64,
    ) -> Self {
        Self {
            gear,
            messages,
            execution,
            queue,
            eth_block_time_secs,
        }
    }

    pub async fn relay(
        &self,
        request: Request,
        on_status: &(dyn Fn(&Status) + Send + Sync),
    ) -> Result<MessageProcessed> {
        let mut stage = Stage::LocatingMessage;
        loop {
            on_status(&self.status(&request, &stage));
            match self.step(&request, stage).await {
                Ok(Transition::Next(next)) => stage = next,
                Ok(Transition::Done(processed)) => {
                    info!(tx_hash = %processed.tx_hash, nonce = %request.nonce, "message processed");
                    on_status(&Status::Succeeded {
                        tx_hash: processed.tx_hash,
                    });
                    return Ok(processed);
                }
                Err(e) => {
                    warn!(block = request.block, nonce = %request.nonce, error = %e, "relay failed");
                    on_status(&Status::Failed {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }
    }

    fn status(&self, request: &Request, stage: &Stage) -> Status {
        match stage {
            Stage::LocatingMessage => Status::LocatingMessage {
                block: request.block,
                nonce: request.nonce,
            },
            Stage::ResolvingAuthorityEpoch { block_hash, .. } => Status::ResolvingAuthorityEpoch {
                block_hash: *block_hash,
            },
            Stage::ResolvingMerkleRoot {
                authority_set_id, ..
            } => Status::ResolvingMerkleRoot {
                block: request.block,
                authority_set_id: *authority_set_id,
            },
            Stage::FetchingProof {
                block, merkle_root, ..
            } => Status::FetchingProof {
                block: *block,
                merkle_root: *merkle_root,
            },
            Stage::Submitting(call) => Status::Submitting {
                block: call.block_number,
                leaf_index: call.proof.leaf_index,
                num_leaves: call.proof.num_leaves,
            },
        }
    }

    async fn step(&self, request: &Request, stage: Stage) -> Result<Transition> {
        match stage {
            Stage::LocatingMessage => {
                let block_hash = self.gear.block_hash(request.block).await?;
                let message = self
                    .messages
                    .find_message(request.block, request.nonce)
                    .await?
                    .ok_or_else(|| Error::MessageNotFound {
                        block: request.block,
                        nonce: request.nonce.to_string(),
                    })?;
                Ok(Transition::Next(Stage::ResolvingAuthorityEpoch {
                    block_hash,
                    message,
                }))
            }
            Stage::ResolvingAuthorityEpoch {
                block_hash,
                message,
            } => {
                let authority_set_id = self.gear.authority_set_id(block_hash).await?;
                Ok(Transition::Next(Stage::ResolvingMerkleRoot {
                    block_hash,
                    message,
                    authority_set_id,
                }))
            }
            Stage::ResolvingMerkleRoot {
                block_hash,
                message,
                authority_set_id,
            } => {
                let (block, block_hash, merkle_root) = self
                    .resolve_merkle_root(request, block_hash, authority_set_id)
                    .await?;
                Ok(Transition::Next(Stage::FetchingProof {
                    block,
                    block_hash,
                    message,
                    merkle_root,
                }))
            }
            Stage::FetchingProof {
                block,
                block_hash,
                message,
                merkle_root,
            } => {
                let proof = self.fetch_proof(block, block_hash, &message, merkle_root).await?;
                Ok(Transition::Next(Stage::Submitting(ProcessMessage {
                    block_number: block,
                    message,
                    proof,
                })))
            }
            Stage::Submitting(call) => {
                let processed = process_message(&*self.queue, &call).await?;
                Ok(Transition::Done(processed))
            }
        }
    }

    /// Root covering the message's block, and the block it was published for.
    async fn resolve_merkle_root(
        &self,
        request: &Request,
        block_hash: B256,
        authority_set_id: u64,
    ) -> Result<(u64, B256, B256)> {
        if let Some(root) = self.queue.merkle_root(request.block).await? {
            return Ok((request.block, block_hash, root));
        }

        // Ethereum blocks produced since the Vara block, estimated from the
        // wall clock drift between the two heads.
        let head = self.execution.latest_block().await?;
        let vara_secs = self.gear.block_timestamp_ms(block_hash).await? / 1000;
        let elapsed = head.timestamp.saturating_sub(vara_secs);
        let from = head.number.saturating_sub(elapsed / self.eth_block_time_secs.max(1));
        debug!(block = request.block, from, to = head.number, "merkle root not published for block");

        let found: MerkleRootLog = if request.wait {
            wait_for_merkle_root(&*self.queue, request.block, Some(from)).await?
        } else {
            find_merkle_root_in_range(&*self.queue, from, head.number, request.block).await?
        };
        if found.block_number == request.block {
            return Ok((request.block, block_hash, found.merkle_root));
        }

        let candidate_hash = self.gear.block_hash(found.block_number).await?;
        let candidate_set = self.gear.authority_set_id(candidate_hash).await?;
        if candidate_set != authority_set_id {
            return Err(Error::NoCompatibleMerkleRoot {
                block: request.block,
                candidate: found.block_number,
                block_set: authority_set_id,
                candidate_set,
            });
        }

        info!(
            block = request.block,
            substitute = found.block_number,
            authority_set_id,
            "using merkle root of a later block"
        );
        Ok((found.block_number, candidate_hash, found.merkle_root))
    }

    async fn fetch_proof(
        &self,
        block: u64,
        block_hash: B256,
        message: &CrossChainMessage,
        merkle_root: B256,
    ) -> Result<MerkleInclusionProof> {
        let proof = self
            .gear
            .merkle_proof(block_hash, B256::from(message.hash()))
            .await?
            .ok_or_else(|| Error::MessageNotFound {
                block,
                nonce: message.nonce().to_string(),
            })?;
        proof.validate()?;

        let proof_root = B256::from(proof.root);
        if proof_root != merkle_root {
            return Err(Error::ProofRootMismatch {
                proof: proof_root,
                published: merkle_root,
            });
        }
        Ok(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::KnownMessages;
    use crate::testing::{message, FakeExecution, FakeGear, FakeQueue};
    use std::sync::Mutex;

    const BLOCK: u64 = 500;
    const HEAD_NUMBER: u64 = 1_000;
    const HEAD_TIME: u64 = 1_750_000_000;

    fn root(block: u64) -> B256 {
        B256::from(U256::from(block) << 8 | U256::from(0xAB))
    }

    fn proof(root: B256) -> MerkleInclusionProof {
        MerkleInclusionProof {
            root: root.0,
            leaf_index: 2,
            num_leaves: 5,
            proof: vec![[0x01; 32], [0x02; 32], [0x03; 32]],
        }
    }

    /// Vara block 500 two minutes before the Ethereum head, and block 510 in
    /// `later_set`.
    fn gear(later_set: u64) -> FakeGear {
        FakeGear::default()
            .with_block(BLOCK, (HEAD_TIME - 120) * 1000, 7)
            .with_block(510, (HEAD_TIME - 60) * 1000, later_set)
            .with_proof(BLOCK, proof(root(BLOCK)))
            .with_proof(510, proof(root(510)))
    }

    fn head() -> FakeExecution {
        let mut execution = FakeExecution::with_block(1);
        execution.block.number = HEAD_NUMBER;
        execution.block.timestamp = HEAD_TIME;
        execution
    }

    fn relayer(gear: FakeGear, queue: Arc<FakeQueue>) -> VaraToEthRelayer {
        VaraToEthRelayer::new(
            Arc::new(gear),
            Arc::new(KnownMessages(vec![(BLOCK, message(3))])),
            Arc::new(head()),
            queue,
            12,
        )
    }

    fn request(wait: bool) -> Request {
        Request {
            block: BLOCK,
            nonce: U256::from(3),
            wait,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Status>>>, impl Fn(&Status) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |status: &Status| sink.lock().unwrap().push(status.clone()))
    }

    #[tokio::test]
    async fn test_relay_with_published_root() {
        let queue = Arc::new(FakeQueue::default().with_root(BLOCK, root(BLOCK)));
        let (seen, on_status) = recorder();

        let processed = relayer(gear(7), queue.clone())
            .relay(request(false), &on_status)
            .await
            .unwrap();
        assert_eq!(processed.vara_block_number, BLOCK);
        assert_eq!(processed.nonce, message(3).contract_nonce());
        assert_eq!(queue.sends(), 1);
        assert_eq!(queue.scanned(), None);

        let seen = seen.lock().unwrap();
        assert!(matches!(seen[0], Status::LocatingMessage { block: BLOCK, .. }));
        assert!(matches!(seen[1], Status::ResolvingAuthorityEpoch { .. }));
        assert!(matches!(seen[2], Status::ResolvingMerkleRoot { authority_set_id: 7, .. }));
        assert!(matches!(seen[3], Status::FetchingProof { block: BLOCK, .. }));
        assert!(matches!(
            seen[4],
            Status::Submitting { block: BLOCK, leaf_index: 2, num_leaves: 5 }
        ));
        assert!(matches!(seen[5], Status::Succeeded { .. }));
    }

    #[tokio::test]
    async fn test_later_root_in_same_epoch_is_substituted() {
        let log = MerkleRootLog {
            block_number: 510,
            merkle_root: root(510),
        };
        let queue = Arc::new(FakeQueue::default().with_logs(&[log]));

        let processed = relayer(gear(7), queue.clone())
            .relay(request(false), &(|_: &Status| {}))
            .await
            .unwrap();
        assert_eq!(processed.vara_block_number, 510);
        // 120 s behind the head at 12 s per block.
        assert_eq!(queue.scanned(), Some((HEAD_NUMBER - 10, HEAD_NUMBER)));
        assert_eq!(queue.last_call().unwrap().block_number, 510);
    }

    #[tokio::test]
    async fn test_later_root_from_other_epoch_is_rejected() {
        let log = MerkleRootLog {
            block_number: 510,
            merkle_root: root(510),
        };
        let queue = Arc::new(FakeQueue::default().with_logs(&[log]));
        let (seen, on_status) = recorder();

        let err = relayer(gear(8), queue.clone())
            .relay(request(false), &on_status)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NoCompatibleMerkleRoot {
                block: BLOCK,
                candidate: 510,
                block_set: 7,
                candidate_set: 8
            }
        ));
        assert_eq!(queue.sends(), 0);
        assert!(matches!(seen.lock().unwrap().last(), Some(Status::Failed { .. })));
    }

    #[tokio::test]
    async fn test_wait_subscribes_from_estimated_block() {
        let log = MerkleRootLog {
            block_number: 510,
            merkle_root: root(510),
        };
        let queue = Arc::new(FakeQueue::default().with_upcoming(&[log]));

        let processed = relayer(gear(7), queue.clone())
            .relay(request(true), &(|_: &Status| {}))
            .await
            .unwrap();
        assert_eq!(processed.vara_block_number, 510);
        assert_eq!(queue.subscribed_from(), Some(Some(HEAD_NUMBER - 10)));
        assert_eq!(queue.scanned(), None);
    }

    #[tokio::test]
    async fn test_unknown_message() {
        let queue = Arc::new(FakeQueue::default().with_root(BLOCK, root(BLOCK)));
        let err = relayer(gear(7), queue)
            .relay(
                Request {
                    nonce: U256::from(4),
                    ..request(false)
                },
                &(|_: &Status| {}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MessageNotFound { block: BLOCK, .. }));
    }

    #[tokio::test]
    async fn test_proof_for_other_root_is_rejected() {
        let queue = Arc::new(FakeQueue::default().with_root(BLOCK, B256::repeat_byte(0xEE)));
        let err = relayer(gear(7), queue.clone())
            .relay(request(false), &(|_: &Status| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProofRootMismatch { .. }));
        assert_eq!(queue.sends(), 0);
    }

    #[tokio::test]
    async fn test_already_processed_stops_at_dry_run() {
        let queue = Arc::new(
            FakeQueue::default()
                .with_root(BLOCK, root(BLOCK))
                .with_processed(message(3).contract_nonce()),
        );
        let err = relayer(gear(7), queue.clone())
            .relay(request(false), &(|_: &Status| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reverted(_)));
        assert_eq!(queue.sends(), 0);
    }
}
