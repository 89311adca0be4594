use serde::{Deserialize, Serialize};

/// EIP-2718 transaction type. Determines the one-byte prefix of the
/// encoded receipt stored in the receipts trie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TxType {
    Legacy = 0x00,
    Eip2930 = 0x01,
    Eip1559 = 0x02,
    Eip4844 = 0x03,
    Eip7702 = 0x04,
}

impl TxType {
    /// Type byte prefixed to the receipt, `None` for legacy receipts.
    pub fn prefix(self) -> Option<u8> {
        match self {
            TxType::Legacy => None,
            other => Some(other as u8),
        }
    }
}

impl TryFrom<u8> for TxType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(TxType::Legacy),
            0x01 => Ok(TxType::Eip2930),
            0x02 => Ok(TxType::Eip1559),
            0x03 => Ok(TxType::Eip4844),
            0x04 => Ok(TxType::Eip7702),
            other => Err(other),
        }
    }
}

/// The consensus part of a receipt: exactly what is committed to in the
/// block's receipts root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEnvelope {
    pub tx_type: TxType,
    /// Post-Byzantium status: true on success.
    pub status: bool,
    /// Cumulative gas used in the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Bloom filter for quick log searching (256 bytes, hex-encoded for serde).
    #[serde(with = "bloom_serde")]
    pub logs_bloom: [u8; 256],
    /// The logs emitted by this transaction.
    pub logs: Vec<Log>,
}

/// A transaction receipt as returned by `eth_getTransactionReceipt`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: [u8; 32],
    /// Position of the transaction within its block. Also the receipts trie key.
    pub transaction_index: u64,
    pub block_hash: [u8; 32],
    pub block_number: u64,
    pub envelope: ReceiptEnvelope,
}

mod bloom_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bloom: &[u8; 256], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bloom)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 256], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() != 256 {
            return Err(serde::de::Error::custom("bloom must be 256 bytes"));
        }
        let mut arr = [0u8; 256];
        arr.copy_from_slice(&bytes);
        Ok(arr)
    }
}

/// A log entry emitted by a smart contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Address of the contract that emitted the log.
    pub address: [u8; 20],
    /// Indexed topics (up to 4, first is usually the event signature hash).
    pub topics: Vec<[u8; 32]>,
    /// Non-indexed data.
    pub data: Vec<u8>,
}

/// The subset of an execution block the proof composer needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionBlock {
    pub hash: [u8; 32],
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    pub receipts_root: [u8; 32],
    /// Transaction hashes in block order.
    pub transactions: Vec<[u8; 32]>,
}

/// A Merkle-Patricia proof of one receipt in the receipts trie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieInclusionProof {
    /// Trie nodes from the root down to the leaf holding the receipt.
    pub nodes: Vec<Vec<u8>>,
    /// The EIP-2718 encoded receipt stored at the leaf.
    pub receipt: Vec<u8>,
}
