//! Beacon node access.

use async_trait::async_trait;
use ferry_core::{slot_at, BeaconBlock, BlockHeader};
use futures::{stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use url::Url;

use crate::api::{ApiBeaconBlock, ApiGenesis, ApiHeaderData, ApiResponse, ApiSigned};
use crate::error::{Error, Result};

/// Concurrent header requests issued by [`BeaconClient::request_headers`].
const HEADER_REQUEST_CONCURRENCY: usize = 16;

/// Read access to the consensus layer.
#[async_trait]
pub trait BeaconClient: Send + Sync {
    /// Unix time of the genesis slot.
    async fn genesis_time(&self) -> Result<u64>;

    /// Header of the block proposed at `slot`, `None` if the slot was skipped.
    async fn block_header(&self, slot: u64) -> Result<Option<BlockHeader>>;

    async fn block(&self, slot: u64) -> Result<BeaconBlock>;

    async fn block_by_root(&self, root: [u8; 32]) -> Result<BeaconBlock>;

    /// Headers of every non-skipped slot in `from..=to`, ascending.
    async fn request_headers(&self, from: u64, to: u64) -> Result<Vec<BlockHeader>> {
        let headers: Vec<Option<BlockHeader>> = stream::iter(from..=to)
            .map(|slot| self.block_header(slot))
            .buffered(HEADER_REQUEST_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(headers.into_iter().flatten().collect())
    }

    /// Slot of the beacon block that carries an execution block with `timestamp`.
    async fn slot_of(&self, timestamp: u64, seconds_per_slot: u64) -> Result<u64> {
        let genesis = self.genesis_time().await?;
        slot_at(timestamp, genesis, seconds_per_slot)
            .ok_or(Error::SlotBeforeGenesis { timestamp, genesis })
    }
}

/// Beacon node REST client.
pub struct HttpBeaconClient {
    url: Url,
    http_client: reqwest::Client,
    genesis_time: OnceCell<u64>,
}

impl HttpBeaconClient {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            http_client: reqwest::Client::new(),
            genesis_time: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// GET `path` and unwrap the `data` envelope. 404 maps to `None`.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.url.join(path)?;
        let response = self.http_client.get(url.clone()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: ApiResponse<T> = response.json().await?;
        Ok(Some(body.data))
    }

    async fn get_block(&self, block_id: &str) -> Result<BeaconBlock> {
        let block: ApiSigned<ApiBeaconBlock> = self
            .get(&format!("eth/v2/beacon/blocks/{block_id}"))
            .await?
            .ok_or_else(|| Error::BlockNotFound(format!("beacon block {block_id}")))?;
        block
            .message
            .to_core()
            .map_err(|e| Error::malformed("beacon block", e))
    }
}

#[async_trait]
impl BeaconClient for HttpBeaconClient {
    async fn genesis_time(&self) -> Result<u64> {
        self.genesis_time
            .get_or_try_init(|| async {
                let genesis: ApiGenesis = self
                    .get("eth/v1/beacon/genesis")
                    .await?
                    .ok_or_else(|| Error::BlockNotFound("genesis".into()))?;
                let time = genesis
                    .genesis_time()
                    .map_err(|e| Error::malformed("genesis time", e))?;
                tracing::debug!(genesis_time = time, "fetched beacon genesis");
                Ok(time)
            })
            .await
            .copied()
    }

    async fn block_header(&self, slot: u64) -> Result<Option<BlockHeader>> {
        let header: Option<ApiHeaderData> =
            self.get(&format!("eth/v1/beacon/headers/{slot}")).await?;
        header
            .map(|h| {
                h.header
                    .message
                    .to_core()
                    .map_err(|e| Error::malformed("block header", e))
            })
            .transpose()
    }

    async fn block(&self, slot: u64) -> Result<BeaconBlock> {
        self.get_block(&slot.to_string()).await
    }

    async fn block_by_root(&self, root: [u8; 32]) -> Result<BeaconBlock> {
        self.get_block(&format!("0x{}", hex::encode(root))).await
    }
}
