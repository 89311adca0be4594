//! SCALE wire format spoken by the Vara programs.
//!
//! Program calls are routed by name: a request is
//! `SCALE(service) ++ SCALE(method) ++ SCALE(args)` and the reply echoes the
//! same route before the encoded result.

use codec::{Decode, DecodeAll, Encode};
use thiserror::Error;

use crate::types::bridge::ProofResult;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("Reply is routed to {actual}, expected {expected}")]
    UnexpectedRoute { expected: String, actual: String },
}

/// Encode a proof for the Vara event client.
///
/// Layout: block inclusion proof, then the trie branch as a compact-length
/// list of compact-length byte strings, then the transaction index as a
/// little-endian u64, then the receipt RLP as compact-length bytes.
pub fn encode_proof_result(proof: &ProofResult) -> Vec<u8> {
    proof.encode()
}

/// Decode a proof encoded by [`encode_proof_result`]. Trailing bytes are an error.
pub fn decode_proof_result(bytes: &[u8]) -> Result<ProofResult, WireError> {
    ProofResult::decode_all(&mut &bytes[..]).map_err(|e| WireError::Decode {
        what: "ProofResult",
        reason: e.to_string(),
    })
}

/// Routing prefix of a program method: `SCALE(service) ++ SCALE(method)`.
pub fn route_prefix(service: &str, method: &str) -> Vec<u8> {
    let mut out = service.encode();
    method.encode_to(&mut out);
    out
}

/// Encode a call to `service::method` with `args` (a tuple for several arguments).
pub fn encode_call<A: Encode>(service: &str, method: &str, args: &A) -> Vec<u8> {
    let mut out = route_prefix(service, method);
    args.encode_to(&mut out);
    out
}

/// Decode the reply to `service::method`, checking the echoed route.
pub fn decode_reply<T: Decode>(service: &str, method: &str, reply: &[u8]) -> Result<T, WireError> {
    let mut input = reply;
    let (got_service, got_method) =
        <(String, String)>::decode(&mut input).map_err(|e| WireError::Decode {
            what: "reply route",
            reason: e.to_string(),
        })?;

    if got_service != service || got_method != method {
        return Err(WireError::UnexpectedRoute {
            expected: format!("{service}/{method}"),
            actual: format!("{got_service}/{got_method}"),
        });
    }

    T::decode_all(&mut input).map_err(|e| WireError::Decode {
        what: "reply payload",
        reason: e.to_string(),
    })
}
