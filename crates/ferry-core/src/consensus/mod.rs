pub mod block;
pub mod header_chain;

/// Consensus slot of an execution block, from its timestamp.
///
/// Returns `None` for timestamps before genesis.
pub fn slot_at(timestamp: u64, genesis_time: u64, seconds_per_slot: u64) -> Option<u64> {
    timestamp
        .checked_sub(genesis_time)
        .and_then(|elapsed| elapsed.checked_div(seconds_per_slot))
}
