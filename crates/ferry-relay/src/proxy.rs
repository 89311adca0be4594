//! Historical proxy program: routes an Ethereum receipt proof to the event
//! client responsible for its slot.

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use codec::{Decode, Encode};
use ferry_core::wire::{decode_reply, encode_call};
use futures::future::BoxFuture;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::gear::ProgramQuery;

const PROXY_SERVICE: &str = "HistoricalProxy";
const EVENT_CLIENT_SERVICE: &str = "EthereumEventClient";

/// Errors reported by an Ethereum event client program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Error)]
pub enum EventClientError {
    #[error("failed to decode receipt envelope")]
    DecodeReceiptEnvelopeFailure,
    #[error("transaction failed on Ethereum")]
    FailedEthTransaction,
    #[error("failed to send message")]
    SendFailure,
    #[error("failed to receive reply")]
    ReplyFailure,
    #[error("failed to decode handle result")]
    HandleResultDecodeFailure,
    #[error("no checkpoint for the block's slot")]
    MissingCheckpoint,
    #[error("invalid block proof")]
    InvalidBlockProof,
    #[error("trie database failure")]
    TrieDbFailure,
    #[error("invalid receipt proof")]
    InvalidReceiptProof,
}

/// Errors reported by the historical proxy program.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Error)]
pub enum ProxyError {
    #[error("no endpoint for slot {0}")]
    NoEndpointForSlot(u64),
    #[error("failed to send message: {0}")]
    SendFailure(String),
    #[error("failed to receive reply: {0}")]
    ReplyFailure(String),
    #[error("failed to decode reply: {0}")]
    DecodeFailure(String),
    #[error("event client: {0}")]
    EthereumEventClient(EventClientError),
}

/// Reply of `HistoricalProxy/Redirect`: the receipt and the client's reply.
pub type RedirectReply = std::result::Result<(Vec<u8>, Vec<u8>), ProxyError>;

/// Slot to endpoint table of the historical proxy.
#[async_trait]
pub trait HistoricalProxy: Send + Sync {
    /// Event client program responsible for `slot`.
    async fn endpoint_for(&self, slot: u64) -> Result<B256>;

    /// Checkpoint light client the event client at `endpoint` trusts.
    async fn checkpoint_client_address(&self, endpoint: B256) -> Result<B256>;
}

/// [`HistoricalProxy`] backed by read-only program queries.
pub struct HistoricalProxyClient {
    program: B256,
    query: Arc<dyn ProgramQuery>,
}

impl HistoricalProxyClient {
    pub fn new(program: B256, query: Arc<dyn ProgramQuery>) -> Self {
        Self { program, query }
    }

    pub fn program(&self) -> B256 {
        self.program
    }
}

#[async_trait]
impl HistoricalProxy for HistoricalProxyClient {
    async fn endpoint_for(&self, slot: u64) -> Result<B256> {
        let payload = encode_call(PROXY_SERVICE, "EndpointFor", &slot);
        let reply = self.query.query(self.program, payload).await?;
        let endpoint: std::result::Result<[u8; 32], ProxyError> =
            decode_reply(PROXY_SERVICE, "EndpointFor", &reply)?;
        Ok(B256::from(endpoint?))
    }

    async fn checkpoint_client_address(&self, endpoint: B256) -> Result<B256> {
        let payload = encode_call(EVENT_CLIENT_SERVICE, "CheckpointLightClientAddress", &());
        let reply = self.query.query(endpoint, payload).await?;
        let address: [u8; 32] =
            decode_reply(EVENT_CLIENT_SERVICE, "CheckpointLightClientAddress", &reply)?;
        Ok(B256::from(address))
    }
}

/// Arguments of `HistoricalProxy/Redirect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCall {
    pub slot: u64,
    /// SCALE encoded proof.
    pub proofs: Vec<u8>,
    /// Program the receipt is forwarded to on success.
    pub client: B256,
    /// Route called on `client`, SCALE encoded.
    pub client_route: Vec<u8>,
}

impl RedirectCall {
    pub fn payload(&self) -> Vec<u8> {
        encode_call(
            PROXY_SERVICE,
            "Redirect",
            &(self.slot, &self.proofs, self.client.0, &self.client_route),
        )
    }
}

/// Decode the raw reply to a redirect.
pub fn decode_redirect_reply(reply: &[u8]) -> Result<RedirectReply> {
    Ok(decode_reply(PROXY_SERVICE, "Redirect", reply)?)
}

/// A message accepted into a Vara block.
pub struct SentMessage {
    pub block_hash: B256,
    pub message_id: B256,
    pub tx_hash: B256,
    /// Raw reply payload, once the program has replied.
    pub reply: BoxFuture<'static, Result<Vec<u8>>>,
    /// Resolves when the including block is finalized.
    pub finalized: BoxFuture<'static, Result<bool>>,
}

/// Signed message submission to a Vara program.
///
/// Signing needs the account keys and the node's metadata, so this is supplied
/// by the embedding application.
#[async_trait]
pub trait ProxySubmitter: Send + Sync {
    /// Dry-run `payload` and return the gas it needs.
    async fn calculate_gas(&self, program: B256, payload: &[u8]) -> Result<u64>;

    async fn send(&self, program: B256, payload: Vec<u8>, gas_limit: u64) -> Result<SentMessage>;
}
