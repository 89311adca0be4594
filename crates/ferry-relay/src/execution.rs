//! Ethereum execution layer access.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use ferry_core::types::execution::{ExecutionBlock, TransactionReceipt};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::api::{ApiBlock, ApiLog, ApiReceipt};
use crate::error::{Error, Result};
use crate::rpc::RpcClient;

/// Read access to an execution chain.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>>;

    async fn block_by_hash(&self, block_hash: B256) -> Result<Option<ExecutionBlock>>;

    async fn latest_block(&self) -> Result<ExecutionBlock>;

    /// Every receipt of the block, in transaction order.
    async fn block_receipts(&self, block: &ExecutionBlock) -> Result<Vec<TransactionReceipt>> {
        let receipts = try_join_all(block.transactions.iter().map(|hash| async move {
            let hash = B256::from(*hash);
            self.transaction_receipt(hash)
                .await?
                .ok_or(Error::TransactionNotFound(hash))
        }))
        .await?;
        Ok(receipts)
    }
}

/// Log filter for `eth_getLogs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub address: Address,
    pub from_block: String,
    pub to_block: String,
    pub topics: Vec<B256>,
}

impl LogFilter {
    pub fn new(address: Address, topic0: B256, from: u64, to: u64) -> Self {
        Self {
            address,
            from_block: format!("{from:#x}"),
            to_block: format!("{to:#x}"),
            topics: vec![topic0],
        }
    }
}

/// Execution layer JSON-RPC client.
#[derive(Clone)]
pub struct HttpExecutionClient {
    rpc: RpcClient,
}

impl HttpExecutionClient {
    pub fn new(url: Url) -> Self {
        Self {
            rpc: RpcClient::new(url),
        }
    }

    pub fn url(&self) -> &Url {
        self.rpc.url()
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, from: Option<Address>, to: Address, data: &Bytes) -> Result<Bytes> {
        let mut tx = json!({ "to": to, "data": data });
        if let Some(from) = from {
            tx["from"] = json!(from);
        }
        self.rpc.request_some("eth_call", (tx, "latest")).await
    }

    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<ApiLog>> {
        let logs: Option<Vec<ApiLog>> = self.rpc.request("eth_getLogs", (filter,)).await?;
        Ok(logs.unwrap_or_default())
    }

    pub async fn block_number(&self) -> Result<u64> {
        let number: String = self.rpc.request_some("eth_blockNumber", ()).await?;
        crate::api::parse_quantity(&number).map_err(|e| Error::malformed("block number", e))
    }

    /// Send a transaction from an account the node holds keys for.
    pub async fn send_transaction(&self, from: Address, to: Address, data: &Bytes) -> Result<B256> {
        self.rpc
            .request_some(
                "eth_sendTransaction",
                (json!({ "from": from, "to": to, "data": data }),),
            )
            .await
    }

    /// Poll until the transaction is mined and return its raw receipt.
    pub async fn wait_for_receipt(&self, tx_hash: B256, poll: Duration) -> Result<ApiReceipt> {
        loop {
            if let Some(receipt) = self
                .rpc
                .request::<_, ApiReceipt>("eth_getTransactionReceipt", (tx_hash,))
                .await?
            {
                return Ok(receipt);
            }
            tracing::debug!(%tx_hash, "transaction not mined yet");
            tokio::time::sleep(poll).await;
        }
    }
}

#[async_trait]
impl ExecutionClient for HttpExecutionClient {
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TransactionReceipt>> {
        let receipt: Option<ApiReceipt> =
            self.rpc.request("eth_getTransactionReceipt", (tx_hash,)).await?;
        receipt
            .map(|r| r.to_core().map_err(|e| Error::malformed("receipt", e)))
            .transpose()
    }

    async fn block_by_hash(&self, block_hash: B256) -> Result<Option<ExecutionBlock>> {
        let block: Option<ApiBlock> =
            self.rpc.request("eth_getBlockByHash", (block_hash, false)).await?;
        block
            .map(|b| b.to_core().map_err(|e| Error::malformed("block", e)))
            .transpose()
    }

    async fn latest_block(&self) -> Result<ExecutionBlock> {
        let block: ApiBlock = self
            .rpc
            .request("eth_getBlockByNumber", ("latest", false))
            .await?
            .ok_or_else(|| Error::BlockNotFound("latest".into()))?;
        block.to_core().map_err(|e| Error::malformed("block", e))
    }

    async fn block_receipts(&self, block: &ExecutionBlock) -> Result<Vec<TransactionReceipt>> {
        let hash = B256::from(block.hash);
        let receipts: Vec<ApiReceipt> = self
            .rpc
            .request("eth_getBlockReceipts", (hash,))
            .await?
            .ok_or_else(|| Error::BlockNotFound(hash.to_string()))?;
        receipts
            .iter()
            .map(|r| r.to_core().map_err(|e| Error::malformed("receipt", e)))
            .collect()
    }
}
