//! Bincode persistence for the pool state store.
//!
//! A snapshot is the full pool set, the token registry, and the running
//! stats. Restoring rebuilds the pair index from scratch; the index is
//! derivable state and is never serialized.

use serde::{Deserialize, Serialize};

use sim_types::{PoolSnapshot, TokenInfo};

use crate::store::{PoolStateStore, StoreError, StoreStats};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotData {
    version: u32,
    pools: Vec<PoolSnapshot>,
    tokens: Vec<TokenInfo>,
    stats: StoreStats,
}

impl PoolStateStore {
    /// Serializes the full store state.
    pub fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let data = SnapshotData {
            version: SNAPSHOT_VERSION,
            pools: self.all_pools(),
            tokens: self.all_tokens(),
            stats: self.stats(),
        };
        Ok(bincode::serialize(&data)?)
    }

    /// Replaces the store contents with a previously taken snapshot.
    pub fn restore(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let data: SnapshotData = bincode::deserialize(bytes)?;
        if data.version != SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedSnapshotVersion(data.version));
        }
        self.load(data.pools, data.tokens, data.stats);
        Ok(())
    }
}
