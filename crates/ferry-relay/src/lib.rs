//! # Ferry Relay
//!
//! Network side of the Ethereum <-> Vara bridge: talks to an execution node,
//! a beacon node, a Vara node and the bridge programs and contracts on both
//! chains, and feeds their data through `ferry_core`.
//!
//! Every chain surface is a small capability trait with one HTTP
//! implementation, so the relay logic runs unchanged against in-memory
//! chains in tests.
//!
//! ## Ethereum to Vara
//!
//! [`composer::ProofComposer`] turns a transaction hash into a
//! [`ferry_core::ProofResult`] anchored at a checkpoint the Vara checkpoint
//! light client stores. [`eth_to_vara::EthToVaraRelayer`] submits it through
//! the historical proxy and reports the client program's reply.
//!
//! ## Vara to Ethereum
//!
//! [`vara_to_eth::VaraToEthRelayer`] finds a merkle root published on
//! Ethereum that covers a queued Vara message, fetches the message's proof
//! and calls `processMessage` on the message queue contract after a dry run.

pub mod api;
pub mod beacon;
pub mod checkpoint;
pub mod composer;
pub mod config;
pub mod error;
pub mod eth_to_vara;
pub mod execution;
pub mod gear;
pub mod message_queue;
pub mod proxy;
pub mod rpc;
pub mod vara_to_eth;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{Error, Result};
