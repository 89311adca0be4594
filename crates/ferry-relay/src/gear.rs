//! Vara node access: block metadata, bridge merkle proofs and read-only
//! program queries.

use alloy_primitives::{B256, U256};
use async_trait::async_trait;
use codec::Decode;
use ferry_core::types::bridge::{CrossChainMessage, MerkleInclusionProof};
use hex_literal::hex;
use url::Url;

use crate::api::{hex_to_bytes, ApiMerkleProof, ApiReplyInfo};
use crate::error::{Error, Result};
use crate::rpc::RpcClient;

/// `twox128("Timestamp") ++ twox128("Now")`.
const TIMESTAMP_NOW_KEY: [u8; 32] =
    hex!("f0c365c3cf59d671eb72da0e7a4113c49f1f0515f462cdcf84e0f1d6045dfcbb");

/// `twox128("Grandpa") ++ twox128("CurrentSetId")`.
const GRANDPA_SET_ID_KEY: [u8; 32] =
    hex!("5f9cc45b7a00c5899361e1c6099678dc8a2d09463effcc78a22d75b9cb87dffc");

/// Chain state the Vara to Ethereum relayer reads.
#[async_trait]
pub trait GearChain: Send + Sync {
    async fn block_hash(&self, number: u64) -> Result<B256>;

    /// Block timestamp in milliseconds.
    async fn block_timestamp_ms(&self, block: B256) -> Result<u64>;

    /// GRANDPA authority set id stored at `block`.
    async fn authority_set_id(&self, block: B256) -> Result<u64>;

    /// Proof that `message_hash` is a leaf of the message tree of `block`.
    async fn merkle_proof(
        &self,
        block: B256,
        message_hash: B256,
    ) -> Result<Option<MerkleInclusionProof>>;
}

/// Read-only execution of a program message.
#[async_trait]
pub trait ProgramQuery: Send + Sync {
    /// Compute the reply `program` would send to `payload`.
    ///
    /// An error reply is returned as [`Error::Program`].
    async fn query(&self, program: B256, payload: Vec<u8>) -> Result<Vec<u8>>;
}

/// Lookup of `MessageQueued` bridge events.
///
/// Decoding runtime events needs the node's metadata, so this is supplied by
/// the embedding application.
#[async_trait]
pub trait MessageLookup: Send + Sync {
    async fn find_message(&self, block: u64, nonce: U256) -> Result<Option<CrossChainMessage>>;
}

/// Messages already known to the caller, e.g. passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct KnownMessages(pub Vec<(u64, CrossChainMessage)>);

#[async_trait]
impl MessageLookup for KnownMessages {
    async fn find_message(&self, block: u64, nonce: U256) -> Result<Option<CrossChainMessage>> {
        Ok(self
            .0
            .iter()
            .find(|(b, m)| *b == block && m.nonce() == nonce)
            .map(|(_, m)| m.clone()))
    }
}

/// Vara node JSON-RPC client.
#[derive(Clone)]
pub struct HttpGearClient {
    rpc: RpcClient,
    origin: B256,
    gas_limit: u64,
}

impl HttpGearClient {
    pub fn new(url: Url, origin: B256, gas_limit: u64) -> Self {
        Self {
            rpc: RpcClient::new(url),
            origin,
            gas_limit,
        }
    }

    async fn storage_u64(&self, key: [u8; 32], block: B256, what: &'static str) -> Result<u64> {
        let key = format!("0x{}", hex::encode(key));
        let value: String = self
            .rpc
            .request("state_getStorage", (key, block))
            .await?
            .ok_or_else(|| Error::BlockNotFound(format!("{what} at Vara block {block}")))?;
        let bytes = hex_to_bytes(&value).map_err(|e| Error::malformed(what, e))?;
        u64::decode(&mut &bytes[..]).map_err(|e| Error::malformed(what, e))
    }
}

#[async_trait]
impl GearChain for HttpGearClient {
    async fn block_hash(&self, number: u64) -> Result<B256> {
        self.rpc
            .request("chain_getBlockHash", (number,))
            .await?
            .ok_or_else(|| Error::BlockNotFound(format!("Vara block #{number}")))
    }

    async fn block_timestamp_ms(&self, block: B256) -> Result<u64> {
        self.storage_u64(TIMESTAMP_NOW_KEY, block, "block timestamp").await
    }

    async fn authority_set_id(&self, block: B256) -> Result<u64> {
        self.storage_u64(GRANDPA_SET_ID_KEY, block, "authority set id").await
    }

    async fn merkle_proof(
        &self,
        block: B256,
        message_hash: B256,
    ) -> Result<Option<MerkleInclusionProof>> {
        let proof: Option<ApiMerkleProof> = self
            .rpc
            .request("gearBridge_merkleProof", (message_hash, block))
            .await?;
        proof
            .map(|p| p.to_core().map_err(|e| Error::malformed("merkle proof", e)))
            .transpose()
    }
}

#[async_trait]
impl ProgramQuery for HttpGearClient {
    async fn query(&self, program: B256, payload: Vec<u8>) -> Result<Vec<u8>> {
        let reply: ApiReplyInfo = self
            .rpc
            .request_some(
                "gear_calculateReplyForHandle",
                (
                    self.origin,
                    program,
                    format!("0x{}", hex::encode(&payload)),
                    self.gas_limit,
                    0u128,
                ),
            )
            .await?;

        let bytes = reply.payload().map_err(|e| Error::malformed("reply payload", e))?;
        if !reply.is_success() {
            return Err(Error::Program {
                program,
                reason: format!("{} {}", reply.code, String::from_utf8_lossy(&bytes)),
            });
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::message;

    #[tokio::test]
    async fn test_known_messages_match_block_and_nonce() {
        let known = KnownMessages(vec![(10, message(1)), (10, message(2)), (11, message(3))]);

        let found = known.find_message(10, U256::from(2)).await.unwrap();
        assert_eq!(found, Some(message(2)));

        assert_eq!(known.find_message(11, U256::from(2)).await.unwrap(), None);
        assert_eq!(known.find_message(12, U256::from(3)).await.unwrap(), None);
    }

    #[test]
    fn test_storage_value_decodes_little_endian() {
        let value = hex_to_bytes("0x40e2010000000000").unwrap();
        assert_eq!(u64::decode(&mut &value[..]).unwrap(), 123_456);
    }
}
