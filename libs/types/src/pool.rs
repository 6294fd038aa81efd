//! Pool identity and per-protocol curve state.
//!
//! A pool is identified by its 20-byte address plus a protocol variant tag.
//! The variant-specific pricing state lives in [`CurveState`], a sum type
//! dispatched by the math engine — there is deliberately no trait hierarchy
//! here, so adding a variant is one enum arm plus one formula module.

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::token::TokenInfo;

/// Protocol family a pool belongs to. Determines which pricing formula
/// applies and the base gas cost of a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolVariant {
    ConstantProduct,
    ConcentratedLiquidity,
    StableSwap,
}

/// One initialized tick boundary of a concentrated-liquidity pool.
///
/// `liquidity_net` is the signed liquidity change applied when the price
/// crosses this tick moving left-to-right (lower to higher price).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInfo {
    pub index: i32,
    pub liquidity_net: i128,
}

/// Variant-specific pricing state. Reserves and prices are raw on-chain
/// integers in each token's native decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveState {
    ConstantProduct {
        reserve0: U256,
        reserve1: U256,
    },
    Concentrated {
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
        tick_spacing: i32,
        /// Initialized ticks, sorted ascending by index.
        ticks: Vec<TickInfo>,
    },
    Stable {
        reserve0: U256,
        reserve1: U256,
        /// Amplification coefficient.
        amp: u64,
    },
}

impl CurveState {
    pub fn variant(&self) -> PoolVariant {
        match self {
            CurveState::ConstantProduct { .. } => PoolVariant::ConstantProduct,
            CurveState::Concentrated { .. } => PoolVariant::ConcentratedLiquidity,
            CurveState::Stable { .. } => PoolVariant::StableSwap,
        }
    }

    /// Whether the state carries enough liquidity data to quote against.
    pub fn is_quotable(&self) -> bool {
        match self {
            CurveState::ConstantProduct { reserve0, reserve1 }
            | CurveState::Stable {
                reserve0, reserve1, ..
            } => !reserve0.is_zero() && !reserve1.is_zero(),
            CurveState::Concentrated {
                sqrt_price_x96,
                liquidity,
                ..
            } => !sqrt_price_x96.is_zero() && *liquidity > 0,
        }
    }
}

/// Immutable creation-time facts about a pool, carried by the first delta
/// that references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    /// Swap fee in basis points (30 = 0.3%).
    pub fee_bps: u32,
    pub variant: PoolVariant,
}

/// Full state of one tracked pool at a point in time.
///
/// The token pair is fixed at creation; curve state, TVL and the active flag
/// move only through ingestion deltas applied in non-decreasing block order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub address: Address,
    pub token0: TokenInfo,
    pub token1: TokenInfo,
    pub fee_bps: u32,
    pub curve: CurveState,
    /// Upstream valuation of locked reserves, reference currency (USD).
    pub tvl_usd: Decimal,
    pub last_block: u64,
    /// Cleared when the feed reports the pool removed; never deleted.
    pub active: bool,
}

impl PoolSnapshot {
    pub fn variant(&self) -> PoolVariant {
        self.curve.variant()
    }

    pub fn contains_token(&self, token: Address) -> bool {
        self.token0.address == token || self.token1.address == token
    }

    /// True when the snapshot serves the given ordered pair in either
    /// direction.
    pub fn matches_pair(&self, a: Address, b: Address) -> bool {
        (self.token0.address == a && self.token1.address == b)
            || (self.token0.address == b && self.token1.address == a)
    }

    /// Key under which pair indices store this pool (token addresses sorted).
    pub fn pair_key(&self) -> (Address, Address) {
        sorted_pair(self.token0.address, self.token1.address)
    }
}

/// Canonical ordering for pair-index keys.
pub fn sorted_pair(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[test]
    fn pair_matching_is_direction_agnostic() {
        let pool = PoolSnapshot {
            address: addr(1),
            token0: TokenInfo::new(addr(2), "AAA", 18),
            token1: TokenInfo::new(addr(3), "BBB", 6),
            fee_bps: 30,
            curve: CurveState::ConstantProduct {
                reserve0: U256::from(1000u64),
                reserve1: U256::from(2000u64),
            },
            tvl_usd: Decimal::ZERO,
            last_block: 0,
            active: true,
        };

        assert!(pool.matches_pair(addr(2), addr(3)));
        assert!(pool.matches_pair(addr(3), addr(2)));
        assert!(!pool.matches_pair(addr(2), addr(4)));
        assert_eq!(pool.pair_key(), (addr(2), addr(3)));
    }

    #[test]
    fn quotable_requires_liquidity() {
        let empty = CurveState::ConstantProduct {
            reserve0: U256::ZERO,
            reserve1: U256::from(5u64),
        };
        assert!(!empty.is_quotable());

        let concentrated = CurveState::Concentrated {
            sqrt_price_x96: U256::from(1u64) << 96,
            tick: 0,
            liquidity: 0,
            tick_spacing: 60,
            ticks: vec![],
        };
        assert!(!concentrated.is_quotable());
    }
}
