//! Checkpoint light client on Vara: the beacon slots it currently trusts.

use std::{sync::Arc, time::Duration};

use alloy_primitives::B256;
use async_trait::async_trait;
use codec::{Decode, Encode};
use ferry_core::wire::{decode_reply, encode_call};
use futures::{stream, stream::BoxStream, StreamExt};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::gear::ProgramQuery;
use crate::wait::first_match;

/// Why the program has no checkpoint for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum CheckpointError {
    /// The slot is older than every checkpoint still stored.
    OutDated,
    /// No checkpoint at or after the slot has been stored yet.
    NotPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Order {
    Direct,
    Reverse,
}

/// Progress of a backwards replay of headers, if one is running.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ReplayBack {
    pub finalized_header: u64,
    pub last_header: u64,
}

/// A page of stored checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CheckpointState {
    pub checkpoints: Vec<(u64, [u8; 32])>,
    pub replay_back: Option<ReplayBack>,
}

/// A checkpoint stored after a subscription was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCheckpoint {
    pub slot: u64,
    pub tree_hash_root: B256,
}

/// Checkpoint program surface.
#[async_trait]
pub trait CheckpointSource: Send + Sync {
    /// First checkpoint at or after `slot`.
    async fn checkpoint_for(
        &self,
        program: B256,
        slot: u64,
    ) -> Result<std::result::Result<(u64, B256), CheckpointError>>;

    /// The newest stored checkpoint.
    async fn latest_state(&self, program: B256) -> Result<CheckpointState>;

    /// Checkpoints stored from now on, in slot order.
    async fn new_checkpoints(&self, program: B256)
        -> Result<BoxStream<'static, Result<NewCheckpoint>>>;
}

/// [`CheckpointSource`] backed by read-only program queries.
///
/// Nodes reached over HTTP have no push channel, so new checkpoints are
/// observed by polling the program state.
pub struct CheckpointProgram {
    query: Arc<dyn ProgramQuery>,
    poll_interval: Duration,
}

impl CheckpointProgram {
    pub fn new(query: Arc<dyn ProgramQuery>, poll_interval: Duration) -> Self {
        Self {
            query,
            poll_interval,
        }
    }
}

async fn query_state(
    query: &dyn ProgramQuery,
    program: B256,
    order: Order,
    index: u32,
    count: u32,
) -> Result<CheckpointState> {
    let payload = encode_call("ServiceState", "Get", &(order, index, count));
    let reply = query.query(program, payload).await?;
    Ok(decode_reply("ServiceState", "Get", &reply)?)
}

#[async_trait]
impl CheckpointSource for CheckpointProgram {
    async fn checkpoint_for(
        &self,
        program: B256,
        slot: u64,
    ) -> Result<std::result::Result<(u64, B256), CheckpointError>> {
        let payload = encode_call("ServiceCheckpointFor", "Get", &slot);
        let reply = self.query.query(program, payload).await?;
        let result: std::result::Result<(u64, [u8; 32]), CheckpointError> =
            decode_reply("ServiceCheckpointFor", "Get", &reply)?;
        Ok(result.map(|(slot, root)| (slot, B256::from(root))))
    }

    async fn latest_state(&self, program: B256) -> Result<CheckpointState> {
        query_state(&*self.query, program, Order::Reverse, 0, 1).await
    }

    async fn new_checkpoints(
        &self,
        program: B256,
    ) -> Result<BoxStream<'static, Result<NewCheckpoint>>> {
        let start = self.latest_state(program).await?.checkpoints.first().map(|c| c.0);
        let query = self.query.clone();
        let interval = self.poll_interval;

        let events = stream::unfold(start, move |last_seen| {
            let query = query.clone();
            async move {
                loop {
                    tokio::time::sleep(interval).await;
                    let state = match query_state(&*query, program, Order::Reverse, 0, 1).await {
                        Ok(state) => state,
                        Err(e) => return Some((Err(e), last_seen)),
                    };
                    if let Some(&(slot, root)) = state.checkpoints.first() {
                        if last_seen.map_or(true, |seen| slot > seen) {
                            let checkpoint = NewCheckpoint {
                                slot,
                                tree_hash_root: B256::from(root),
                            };
                            return Some((Ok(checkpoint), Some(slot)));
                        }
                    }
                }
            }
        });

        Ok(events.boxed())
    }
}

/// Checkpoint lookups with an optional wait for the checkpoint to appear.
#[derive(Clone)]
pub struct CheckpointClient {
    source: Arc<dyn CheckpointSource>,
}

impl CheckpointClient {
    pub fn new(source: Arc<dyn CheckpointSource>) -> Self {
        Self { source }
    }

    /// Checkpoint at or after `slot` stored by `program`.
    ///
    /// If none is stored yet, fails with [`Error::NotPresent`] unless `wait`
    /// is set, in which case it blocks until the program stores one.
    /// [`Error::OutDated`] is always returned immediately.
    pub async fn checkpoint_for(&self, program: B256, slot: u64, wait: bool) -> Result<(u64, B256)> {
        match self.source.checkpoint_for(program, slot).await? {
            Ok(checkpoint) => return Ok(checkpoint),
            Err(CheckpointError::OutDated) => return Err(Error::OutDated(slot)),
            Err(CheckpointError::NotPresent) if !wait => return Err(Error::NotPresent(slot)),
            Err(CheckpointError::NotPresent) => {}
        }

        info!(slot, %program, "checkpoint not present yet, subscribing");
        let events = self.source.new_checkpoints(program).await?;

        // A checkpoint stored between the first query and the subscription
        // produces no event.
        match self.source.checkpoint_for(program, slot).await? {
            Ok(checkpoint) => return Ok(checkpoint),
            Err(CheckpointError::OutDated) => return Err(Error::OutDated(slot)),
            Err(CheckpointError::NotPresent) => {}
        }

        let event = first_match(events, |c| {
            debug!(slot = c.slot, "new checkpoint");
            c.slot >= slot
        })
        .await?;
        info!(slot, checkpoint = event.slot, "checkpoint stored");

        // The program answers with its earliest checkpoint covering `slot`,
        // which may precede the event when several were stored at once.
        match self.source.checkpoint_for(program, slot).await? {
            Ok(checkpoint) => Ok(checkpoint),
            Err(CheckpointError::OutDated) => Err(Error::OutDated(slot)),
            Err(CheckpointError::NotPresent) => Ok((event.slot, event.tree_hash_root)),
        }
    }

    pub async fn latest_state(&self, program: B256) -> Result<CheckpointState> {
        self.source.latest_state(program).await
    }
}
