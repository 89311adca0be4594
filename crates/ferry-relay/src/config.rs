//! Relayer configuration.

use std::{path::Path, time::Duration};

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Relayer configuration loaded from a TOML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub ethereum: EthereumConfig,
    pub vara: VaraConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Ethereum execution and consensus endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EthereumConfig {
    /// Execution layer JSON-RPC URL.
    pub rpc_url: Url,
    /// Beacon node REST URL.
    pub beacon_url: Url,
    /// Address of the message queue contract.
    pub message_queue: Address,
    /// Unlocked account used for `eth_sendTransaction`. Required only for
    /// relaying Vara messages to Ethereum.
    #[serde(default)]
    pub sender: Option<Address>,
    #[serde(default = "default_seconds_per_slot")]
    pub seconds_per_slot: u64,
    /// Average execution block time, used to estimate which Ethereum blocks
    /// may hold a merkle root published for a given Vara block.
    #[serde(default = "default_block_time")]
    pub block_time_secs: u64,
}

/// Vara node endpoint and bridge programs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VaraConfig {
    /// Vara node JSON-RPC URL.
    pub rpc_url: Url,
    /// Historical proxy program id.
    pub historical_proxy: B256,
    /// Program that receives relayed receipts.
    #[serde(default)]
    pub client: Option<B256>,
    /// Route called on `client`, SCALE encoded.
    #[serde(default)]
    pub client_route: Option<Bytes>,
    /// Account the read-only program queries originate from.
    #[serde(default)]
    pub origin: B256,
    /// Gas limit of read-only program queries.
    #[serde(default = "default_query_gas_limit")]
    pub query_gas_limit: u64,
}

/// Relay loop tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Poll interval of the emulated event subscriptions.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_seconds_per_slot() -> u64 {
    12
}

fn default_block_time() -> u64 {
    12
}

fn default_query_gas_limit() -> u64 {
    250_000_000_000
}

fn default_poll_interval_ms() -> u64 {
    3000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml_edit::de::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ethereum.seconds_per_slot == 0 {
            return Err(Error::Config("ethereum.seconds_per_slot must be non-zero".into()));
        }
        if self.ethereum.block_time_secs == 0 {
            return Err(Error::Config("ethereum.block_time_secs must be non-zero".into()));
        }
        if self.relay.poll_interval_ms == 0 {
            return Err(Error::Config("relay.poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }
}
