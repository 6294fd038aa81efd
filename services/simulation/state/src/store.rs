//! Pool State Store
//!
//! Core state management for all tracked pools. Applies streamed block deltas
//! with stale rejection, maintains a token-pair index in pool insertion order,
//! and hands out cloned snapshots so quoting never holds a store lock.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sim_types::{
    sorted_pair, Address, BlockDelta, CurveState, CurveUpdate, PoolDelta, PoolSnapshot,
    PoolVariant, TokenInfo,
};

/// State store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Snapshot format version {0} is not supported")]
    UnsupportedSnapshotVersion(u32),
}

/// How a single pool delta was disposed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    Applied,
    /// Block height not newer than the pool's last applied block.
    Stale,
    /// Unknown pool without the data needed to create it, or a pool whose
    /// token metadata has not been delivered yet.
    Orphan,
    /// Update fields that contradict the pool's variant.
    Invalid(&'static str),
}

/// Per-block application summary returned to the ingestion loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockOutcome {
    pub applied: u64,
    pub stale: u64,
    pub orphaned: u64,
    pub invalid: u64,
}

/// Store statistics, exposed on the client surface and persisted in
/// snapshots.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_pools: usize,
    pub constant_product_pools: usize,
    pub concentrated_pools: usize,
    pub stable_pools: usize,
    pub tracked_tokens: usize,
    pub blocks_applied: u64,
    pub deltas_applied: u64,
    pub stale_deltas_dropped: u64,
    pub orphan_deltas_dropped: u64,
    pub invalid_deltas_dropped: u64,
    /// Highest block height applied so far.
    pub last_block: u64,
}

/// Manages state for all pools.
pub struct PoolStateStore {
    /// All pools indexed by full 20-byte address.
    pools: DashMap<Address, Arc<RwLock<PoolSnapshot>>>,

    /// Token pair index: sorted (token, token) -> pool addresses in the
    /// order the pools were first seen.
    pair_index: DashMap<(Address, Address), Vec<Address>>,

    /// Token metadata registry fed from block headers.
    tokens: DashMap<Address, TokenInfo>,

    stats: Arc<RwLock<StoreStats>>,
}

impl Default for PoolStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolStateStore {
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
            pair_index: DashMap::new(),
            tokens: DashMap::new(),
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Applies one block of updates: token metadata first, then pool deltas
    /// in their delivered order.
    pub fn apply_block(&self, block: &BlockDelta) -> BlockOutcome {
        for token in &block.tokens {
            self.tokens.insert(token.address, token.clone());
        }

        let mut outcome = BlockOutcome::default();
        for delta in &block.deltas {
            match self.apply_delta(delta) {
                DeltaOutcome::Applied => outcome.applied += 1,
                DeltaOutcome::Stale => {
                    debug!(pool = %delta.pool, block = delta.block, "dropping stale delta");
                    outcome.stale += 1;
                }
                DeltaOutcome::Orphan => {
                    warn!(pool = %delta.pool, block = delta.block, "dropping orphan delta");
                    outcome.orphaned += 1;
                }
                DeltaOutcome::Invalid(reason) => {
                    warn!(pool = %delta.pool, block = delta.block, reason, "dropping invalid delta");
                    outcome.invalid += 1;
                }
            }
        }

        {
            let mut stats = self.stats.write();
            stats.blocks_applied += 1;
            stats.deltas_applied += outcome.applied;
            stats.stale_deltas_dropped += outcome.stale;
            stats.orphan_deltas_dropped += outcome.orphaned;
            stats.invalid_deltas_dropped += outcome.invalid;
            stats.last_block = stats.last_block.max(block.block);
            stats.tracked_tokens = self.tokens.len();
            self.refresh_pool_counts(&mut stats);
        }

        outcome
    }

    /// Applies one pool delta, creating the pool on first sight.
    pub fn apply_delta(&self, delta: &PoolDelta) -> DeltaOutcome {
        let existing = self.pools.get(&delta.pool).map(|e| Arc::clone(e.value()));

        match existing {
            Some(pool_arc) => {
                let mut pool = pool_arc.write();
                // Replays and reordered blocks must be no-ops.
                if delta.block <= pool.last_block {
                    return DeltaOutcome::Stale;
                }
                if let Some(update) = &delta.curve {
                    if let Err(reason) = merge_curve(&mut pool.curve, update) {
                        return DeltaOutcome::Invalid(reason);
                    }
                }
                if let Some(tvl) = delta.tvl_usd {
                    pool.tvl_usd = tvl;
                }
                if let Some(active) = delta.active {
                    pool.active = active;
                }
                pool.last_block = delta.block;
                DeltaOutcome::Applied
            }
            None => self.create_pool(delta),
        }
    }

    fn create_pool(&self, delta: &PoolDelta) -> DeltaOutcome {
        let Some(descriptor) = &delta.descriptor else {
            return DeltaOutcome::Orphan;
        };
        let Some(update) = &delta.curve else {
            return DeltaOutcome::Orphan;
        };

        // Pools whose token metadata has not arrived cannot be quoted;
        // creation waits for a later delta rather than guessing decimals.
        let (Some(token0), Some(token1)) = (
            self.tokens.get(&descriptor.token0).map(|t| t.clone()),
            self.tokens.get(&descriptor.token1).map(|t| t.clone()),
        ) else {
            return DeltaOutcome::Orphan;
        };

        let curve = match materialize_curve(descriptor.variant, update) {
            Ok(curve) => curve,
            Err(reason) => return DeltaOutcome::Invalid(reason),
        };

        let snapshot = PoolSnapshot {
            address: descriptor.address,
            token0,
            token1,
            fee_bps: descriptor.fee_bps,
            curve,
            tvl_usd: delta.tvl_usd.unwrap_or_default(),
            last_block: delta.block,
            active: delta.active.unwrap_or(true),
        };

        self.index_pool(&snapshot);
        self.pools
            .insert(snapshot.address, Arc::new(RwLock::new(snapshot)));
        DeltaOutcome::Applied
    }

    fn index_pool(&self, pool: &PoolSnapshot) {
        let mut entry = self.pair_index.entry(pool.pair_key()).or_default();
        if !entry.contains(&pool.address) {
            entry.push(pool.address);
        }
    }

    /// Cloned snapshot of one pool.
    pub fn get(&self, address: Address) -> Option<PoolSnapshot> {
        self.pools.get(&address).map(|e| e.value().read().clone())
    }

    /// Cloned snapshots of every pool serving the pair, in the order the
    /// pools were first seen by the feed.
    pub fn pools_for_pair(&self, a: Address, b: Address) -> Vec<PoolSnapshot> {
        let key = sorted_pair(a, b);
        let Some(addresses) = self.pair_index.get(&key) else {
            return Vec::new();
        };
        addresses
            .iter()
            .filter_map(|addr| self.get(*addr))
            .collect()
    }

    /// Registers token metadata outside of block application, for bootstrap
    /// or backfill.
    pub fn register_tokens<I: IntoIterator<Item = TokenInfo>>(&self, tokens: I) {
        for token in tokens {
            self.tokens.insert(token.address, token);
        }
        self.stats.write().tracked_tokens = self.tokens.len();
    }

    pub fn token(&self, address: Address) -> Option<TokenInfo> {
        self.tokens.get(&address).map(|t| t.clone())
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.read().clone()
    }

    fn refresh_pool_counts(&self, stats: &mut StoreStats) {
        let mut cp = 0;
        let mut cl = 0;
        let mut stable = 0;
        for entry in self.pools.iter() {
            match entry.value().read().curve.variant() {
                PoolVariant::ConstantProduct => cp += 1,
                PoolVariant::ConcentratedLiquidity => cl += 1,
                PoolVariant::StableSwap => stable += 1,
            }
        }
        stats.total_pools = self.pools.len();
        stats.constant_product_pools = cp;
        stats.concentrated_pools = cl;
        stats.stable_pools = stable;
    }

    pub(crate) fn all_pools(&self) -> Vec<PoolSnapshot> {
        self.pools
            .iter()
            .map(|e| e.value().read().clone())
            .collect()
    }

    pub(crate) fn all_tokens(&self) -> Vec<TokenInfo> {
        self.tokens.iter().map(|e| e.value().clone()).collect()
    }

    pub(crate) fn load(
        &self,
        pools: Vec<PoolSnapshot>,
        tokens: Vec<TokenInfo>,
        stats: StoreStats,
    ) {
        self.pools.clear();
        self.pair_index.clear();
        self.tokens.clear();

        for token in tokens {
            self.tokens.insert(token.address, token);
        }
        for pool in pools {
            self.index_pool(&pool);
            self.pools
                .insert(pool.address, Arc::new(RwLock::new(pool)));
        }
        *self.stats.write() = stats;
    }
}

/// Merges a partial curve update into existing state. Fields that do not
/// belong to the pool's variant make the whole update invalid.
fn merge_curve(curve: &mut CurveState, update: &CurveUpdate) -> Result<(), &'static str> {
    match curve {
        CurveState::ConstantProduct { reserve0, reserve1 } => {
            if update.sqrt_price_x96.is_some()
                || update.tick.is_some()
                || update.liquidity.is_some()
                || update.ticks.is_some()
                || update.tick_spacing.is_some()
                || update.amp.is_some()
            {
                return Err("non-reserve fields on a constant-product pool");
            }
            if let Some(r0) = update.reserve0 {
                *reserve0 = r0;
            }
            if let Some(r1) = update.reserve1 {
                *reserve1 = r1;
            }
        }
        CurveState::Concentrated {
            sqrt_price_x96,
            tick,
            liquidity,
            tick_spacing,
            ticks,
        } => {
            if update.reserve0.is_some() || update.reserve1.is_some() || update.amp.is_some() {
                return Err("reserve fields on a concentrated pool");
            }
            if let Some(price) = update.sqrt_price_x96 {
                *sqrt_price_x96 = price;
            }
            if let Some(t) = update.tick {
                *tick = t;
            }
            if let Some(l) = update.liquidity {
                *liquidity = l;
            }
            if let Some(spacing) = update.tick_spacing {
                *tick_spacing = spacing;
            }
            if let Some(new_ticks) = &update.ticks {
                let mut sorted = new_ticks.clone();
                sorted.sort_by_key(|t| t.index);
                *ticks = sorted;
            }
        }
        CurveState::Stable {
            reserve0,
            reserve1,
            amp,
        } => {
            if update.sqrt_price_x96.is_some()
                || update.tick.is_some()
                || update.liquidity.is_some()
                || update.ticks.is_some()
                || update.tick_spacing.is_some()
            {
                return Err("concentrated fields on a stable pool");
            }
            if let Some(r0) = update.reserve0 {
                *reserve0 = r0;
            }
            if let Some(r1) = update.reserve1 {
                *reserve1 = r1;
            }
            if let Some(a) = update.amp {
                *amp = a;
            }
        }
    }
    Ok(())
}

/// Builds full curve state from a creation delta. The first update must
/// carry every mandatory field for the declared variant.
fn materialize_curve(
    variant: PoolVariant,
    update: &CurveUpdate,
) -> Result<CurveState, &'static str> {
    match variant {
        PoolVariant::ConstantProduct => {
            let (Some(reserve0), Some(reserve1)) = (update.reserve0, update.reserve1) else {
                return Err("constant-product creation requires both reserves");
            };
            Ok(CurveState::ConstantProduct { reserve0, reserve1 })
        }
        PoolVariant::ConcentratedLiquidity => {
            let (Some(sqrt_price_x96), Some(tick), Some(liquidity)) =
                (update.sqrt_price_x96, update.tick, update.liquidity)
            else {
                return Err("concentrated creation requires price, tick and liquidity");
            };
            let mut ticks = update.ticks.clone().unwrap_or_default();
            ticks.sort_by_key(|t| t.index);
            Ok(CurveState::Concentrated {
                sqrt_price_x96,
                tick,
                liquidity,
                tick_spacing: update.tick_spacing.unwrap_or(0),
                ticks,
            })
        }
        PoolVariant::StableSwap => {
            let (Some(reserve0), Some(reserve1), Some(amp)) =
                (update.reserve0, update.reserve1, update.amp)
            else {
                return Err("stable creation requires reserves and amplification");
            };
            Ok(CurveState::Stable {
                reserve0,
                reserve1,
                amp,
            })
        }
    }
}
