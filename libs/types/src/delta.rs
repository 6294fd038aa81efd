//! Incremental state updates from the ingestion feed.
//!
//! The feed delivers one [`BlockDelta`] per block. Each [`PoolDelta`] inside
//! it is a partial update: only the fields present are merged into the stored
//! snapshot, everything else is left untouched. The first delta referencing a
//! pool must carry a [`PoolDescriptor`] so the store can create it.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pool::{PoolDescriptor, TickInfo};
use crate::token::TokenInfo;

/// Partial update to the variant-specific curve state. All fields optional;
/// the update must match the pool's variant or the store rejects it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveUpdate {
    // Constant-product / stable reserves
    pub reserve0: Option<U256>,
    pub reserve1: Option<U256>,

    // Concentrated-liquidity fields
    pub sqrt_price_x96: Option<U256>,
    pub tick: Option<i32>,
    pub liquidity: Option<u128>,
    pub tick_spacing: Option<i32>,
    /// Full replacement of the initialized tick list, sorted ascending.
    pub ticks: Option<Vec<TickInfo>>,

    // Stable-swap amplification
    pub amp: Option<u64>,
}

impl CurveUpdate {
    pub fn is_empty(&self) -> bool {
        self == &CurveUpdate::default()
    }
}

/// One pool's state change at a given block height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDelta {
    pub pool: Address,
    pub block: u64,
    /// Present on first sighting; ignored for already-known pools.
    pub descriptor: Option<PoolDescriptor>,
    pub curve: Option<CurveUpdate>,
    pub tvl_usd: Option<Decimal>,
    /// `Some(false)` marks the pool removed by the feed.
    pub active: Option<bool>,
}

impl PoolDelta {
    /// A bare state change with no creation or metadata updates.
    pub fn update(pool: Address, block: u64, curve: CurveUpdate) -> Self {
        Self {
            pool,
            block,
            descriptor: None,
            curve: Some(curve),
            tvl_usd: None,
            active: None,
        }
    }
}

/// One block's worth of updates: token metadata first, then pool deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockDelta {
    pub block: u64,
    pub tokens: Vec<TokenInfo>,
    pub deltas: Vec<PoolDelta>,
}

impl BlockDelta {
    pub fn new(block: u64) -> Self {
        Self {
            block,
            tokens: Vec::new(),
            deltas: Vec::new(),
        }
    }
}
