//! Ethereum to Vara relayer.
//!
//! Drives one receipt from an Ethereum transaction hash to the reply of the
//! Vara client program that consumed it:
//!
//! ```text
//! ComposingProof -> BuildingTransaction -> Submitting -> AwaitingReply -> Succeeded | Failed
//! ```

use std::sync::Arc;

use alloy_primitives::B256;
use ferry_core::{encode_proof_result, ProofResult};
use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::composer::ProofComposer;
use crate::config::VaraConfig;
use crate::error::{Error, Result};
use crate::proxy::{decode_redirect_reply, ProxyError, ProxySubmitter, RedirectCall, SentMessage};

/// Progress reported to the status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    ComposingProof { tx_hash: B256 },
    BuildingTransaction { slot: u64, transaction_index: u64 },
    Submitting { slot: u64, gas_limit: u64 },
    AwaitingReply {
        block_hash: B256,
        message_id: B256,
        tx_hash: B256,
    },
    Succeeded { message_id: B256 },
    Failed { reason: String },
}

/// Program the historical proxy forwards an accepted receipt to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRoute {
    pub program: B256,
    /// SCALE encoded `service ++ method` called on `program`.
    pub route: Vec<u8>,
}

impl ClientRoute {
    /// The configured client, if both program and route are set.
    pub fn from_config(config: &VaraConfig) -> Option<Self> {
        Some(Self {
            program: config.client?,
            route: config.client_route.as_ref()?.to_vec(),
        })
    }
}

/// A redirect that reached Vara and got a reply.
pub struct RelayResult {
    /// Vara block that included the message.
    pub block_hash: B256,
    pub message_id: B256,
    pub tx_hash: B256,
    /// Resolves once the including block is finalized.
    pub finalized: BoxFuture<'static, Result<bool>>,
    /// Client reply on success, otherwise the proxy's error verbatim.
    pub outcome: std::result::Result<Vec<u8>, ProxyError>,
}

impl std::fmt::Debug for RelayResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayResult")
            .field("block_hash", &self.block_hash)
            .field("message_id", &self.message_id)
            .field("tx_hash", &self.tx_hash)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

enum Stage {
    ComposingProof { tx_hash: B256, wait: bool },
    BuildingTransaction(ProofResult),
    Submitting { call: RedirectCall, gas_limit: u64 },
    AwaitingReply(SentMessage),
}

enum Transition {
    Next(Stage),
    Done(RelayResult),
}

impl Stage {
    fn status(&self) -> Status {
        match self {
            Stage::ComposingProof { tx_hash, .. } => Status::ComposingProof { tx_hash: *tx_hash },
            Stage::BuildingTransaction(proof) => Status::BuildingTransaction {
                slot: proof.proof_block.block.slot,
                transaction_index: proof.transaction_index,
            },
            Stage::Submitting { call, gas_limit } => Status::Submitting {
                slot: call.slot,
                gas_limit: *gas_limit,
            },
            Stage::AwaitingReply(sent) => Status::AwaitingReply {
                block_hash: sent.block_hash,
                message_id: sent.message_id,
                tx_hash: sent.tx_hash,
            },
        }
    }
}

pub struct EthToVaraRelayer {
    composer: Arc<ProofComposer>,
    submitter: Arc<dyn ProxySubmitter>,
    proxy_program: B256,
    client: ClientRoute,
}

impl EthToVaraRelayer {
    pub fn new(
        composer: Arc<ProofComposer>,
        submitter: Arc<dyn ProxySubmitter>,
        proxy_program: B256,
        client: ClientRoute,
    ) -> Self {
        Self {
            composer,
            submitter,
            proxy_program,
            client,
        }
    }

    /// Relay the receipt of `tx_hash`, reporting every transition to
    /// `on_status`.
    ///
    /// Errors before the reply arrives abort the relay; a reply carrying a
    /// proxy error is returned in [`RelayResult::outcome`].
    pub async fn relay(
        &self,
        tx_hash: B256,
        wait: bool,
        on_status: &(dyn Fn(&Status) + Send + Sync),
    ) -> Result<RelayResult> {
        let mut stage = Stage::ComposingProof { tx_hash, wait };
        loop {
            on_status(&stage.status());
            match self.step(stage).await {
                Ok(Transition::Next(next)) => stage = next,
                Ok(Transition::Done(result)) => {
                    match &result.outcome {
                        Ok(_) => on_status(&Status::Succeeded {
                            message_id: result.message_id,
                        }),
                        Err(e) => on_status(&Status::Failed {
                            reason: e.to_string(),
                        }),
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(%tx_hash, error = %e, "relay aborted");
                    on_status(&Status::Failed {
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }
    }

    async fn step(&self, stage: Stage) -> Result<Transition> {
        match stage {
            Stage::ComposingProof { tx_hash, wait } => {
                let proof = self.composer.compose(tx_hash, wait).await?;
                Ok(Transition::Next(Stage::BuildingTransaction(proof)))
            }
            Stage::BuildingTransaction(proof) => {
                let call = RedirectCall {
                    slot: proof.proof_block.block.slot,
                    proofs: encode_proof_result(&proof),
                    client: self.client.program,
                    client_route: self.client.route.clone(),
                };
                let gas_limit = self
                    .submitter
                    .calculate_gas(self.proxy_program, &call.payload())
                    .await?;
                Ok(Transition::Next(Stage::Submitting { call, gas_limit }))
            }
            Stage::Submitting { call, gas_limit } => {
                let sent = self
                    .submitter
                    .send(self.proxy_program, call.payload(), gas_limit)
                    .await?;
                info!(
                    message_id = %sent.message_id,
                    block_hash = %sent.block_hash,
                    "redirect included"
                );
                Ok(Transition::Next(Stage::AwaitingReply(sent)))
            }
            Stage::AwaitingReply(sent) => {
                let reply = sent.reply.await?;
                let outcome = decode_redirect_reply(&reply)?.map(|(_receipt, reply)| reply);
                Ok(Transition::Done(RelayResult {
                    block_hash: sent.block_hash,
                    message_id: sent.message_id,
                    tx_hash: sent.tx_hash,
                    finalized: sent.finalized,
                    outcome,
                }))
            }
        }
    }
}
