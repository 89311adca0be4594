use alloy_rlp::{Decodable, Encodable, Header};

use crate::execution::proof::ProofError;
use crate::types::execution::*;

/// Encode a receipt the way it is stored in the receipts trie (EIP-2718).
///
/// Layout: `[type byte] ++ rlp([status, cumulativeGasUsed, logsBloom, logs])`,
/// where the type byte is omitted for legacy transactions.
pub fn encode_receipt(receipt: &ReceiptEnvelope) -> Vec<u8> {
    let mut payload = Vec::new();
    receipt.status.encode(&mut payload);
    receipt.cumulative_gas_used.encode(&mut payload);
    receipt.logs_bloom.encode(&mut payload);
    encode_logs(&receipt.logs, &mut payload);

    let mut out = Vec::with_capacity(payload.len() + 4);
    if let Some(prefix) = receipt.tx_type.prefix() {
        out.push(prefix);
    }
    encode_list(&payload, &mut out);
    out
}

/// Wrap an encoded receipt as an RLP byte string, the form the Vara event
/// client expects in `receipt_rlp`.
pub fn wrap_receipt_rlp(encoded_receipt: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_receipt.len() + 4);
    encoded_receipt.encode(&mut out);
    out
}

/// Receipts trie key of a transaction: RLP(index).
pub fn receipt_key(index: u64) -> Vec<u8> {
    alloy_rlp::encode(index)
}

/// Decode a receipt from its trie encoding.
/// Post-EIP-2718, receipts may be typed (prefixed with a type byte).
pub fn decode_receipt(data: &[u8]) -> Result<ReceiptEnvelope, ProofError> {
    let (tx_type, mut buf) = match data.first() {
        None => return Err(invalid("empty receipt")),
        Some(&byte) if byte <= 0x7F => {
            let tx_type = TxType::try_from(byte)
                .map_err(|t| invalid(format!("unknown transaction type 0x{:02x}", t)))?;
            (tx_type, &data[1..])
        }
        Some(_) => (TxType::Legacy, data),
    };

    let header = Header::decode(&mut buf).map_err(rlp_error)?;
    if !header.list {
        return Err(invalid("receipt is not an RLP list"));
    }
    if buf.len() != header.payload_length {
        return Err(invalid(format!(
            "receipt payload is {} bytes, header declares {}",
            buf.len(),
            header.payload_length
        )));
    }

    let status = bool::decode(&mut buf).map_err(rlp_error)?;
    let cumulative_gas_used = u64::decode(&mut buf).map_err(rlp_error)?;
    let logs_bloom = <[u8; 256]>::decode(&mut buf).map_err(rlp_error)?;
    let logs = decode_logs(&mut buf)?;

    if !buf.is_empty() {
        return Err(invalid("receipt should have 4 items"));
    }

    Ok(ReceiptEnvelope {
        tx_type,
        status,
        cumulative_gas_used,
        logs_bloom,
        logs,
    })
}

fn encode_logs(logs: &[Log], out: &mut Vec<u8>) {
    let mut payload = Vec::new();
    for log in logs {
        let mut fields = Vec::new();
        log.address.encode(&mut fields);

        let mut topics = Vec::new();
        for topic in &log.topics {
            topic.encode(&mut topics);
        }
        encode_list(&topics, &mut fields);

        log.data.as_slice().encode(&mut fields);
        encode_list(&fields, &mut payload);
    }
    encode_list(&payload, out);
}

fn decode_logs(buf: &mut &[u8]) -> Result<Vec<Log>, ProofError> {
    let mut payload = take_list(buf)?;

    let mut logs = Vec::new();
    while !payload.is_empty() {
        let mut fields = take_list(&mut payload)?;
        let address = <[u8; 20]>::decode(&mut fields).map_err(rlp_error)?;

        let mut topic_items = take_list(&mut fields)?;
        let mut topics = Vec::new();
        while !topic_items.is_empty() {
            topics.push(<[u8; 32]>::decode(&mut topic_items).map_err(rlp_error)?);
        }

        let data = alloy_rlp::Bytes::decode(&mut fields).map_err(rlp_error)?;
        if !fields.is_empty() {
            return Err(invalid("log should have 3 fields"));
        }

        logs.push(Log {
            address,
            topics,
            data: data.to_vec(),
        });
    }

    Ok(logs)
}

// --- RLP helpers ---

fn encode_list(payload: &[u8], out: &mut Vec<u8>) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.extend_from_slice(payload);
}

/// Consume one RLP list from `buf`, returning its payload.
fn take_list<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], ProofError> {
    let header = Header::decode(buf).map_err(rlp_error)?;
    if !header.list {
        return Err(invalid("expected an RLP list"));
    }
    if buf.len() < header.payload_length {
        return Err(invalid("RLP list runs past the end of input"));
    }
    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;
    Ok(payload)
}

fn invalid(reason: impl Into<String>) -> ProofError {
    ProofError::InvalidReceipt {
        reason: reason.into(),
    }
}

fn rlp_error(err: alloy_rlp::Error) -> ProofError {
    invalid(err.to_string())
}
