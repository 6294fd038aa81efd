//! Spot price aggregation across eligible pools.
//!
//! Each pool contributes its marginal price weighted by TVL, so a deep pool
//! dominates a shallow one. Pools that fail to price are skipped; only a
//! pair with no pricing pool at all is an error.

use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use sim_types::{Address, PoolSnapshot};

use crate::error::SimulationError;

/// TVL-weighted spot price of one unit of `base` denominated in `quote`,
/// adjusted for token decimals.
pub fn aggregate_spot_price(
    pools: &[PoolSnapshot],
    base: Address,
    quote: Address,
) -> Result<f64, SimulationError> {
    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;
    let mut unweighted_sum = 0.0f64;
    let mut priced = 0u32;

    for pool in pools {
        let token0_price = match poolsim_amm::spot_price(pool) {
            Ok(price) => price,
            Err(e) => {
                debug!(pool = %pool.address, error = %e, "pool failed to price, skipping");
                continue;
            }
        };

        // Per-pool convention is token0-in-token1; invert for the other
        // direction.
        let price = if pool.token0.address == base {
            token0_price
        } else {
            1.0 / token0_price
        };

        let weight = pool.tvl_usd.to_f64().unwrap_or(0.0).max(0.0);
        weighted_sum += price * weight;
        weight_total += weight;
        unweighted_sum += price;
        priced += 1;
    }

    if priced == 0 {
        return Err(SimulationError::NoLiquidity { base, quote });
    }

    // All-zero TVL degrades to a plain average rather than dividing by zero.
    if weight_total > 0.0 {
        Ok(weighted_sum / weight_total)
    } else {
        Ok(unweighted_sum / priced as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use sim_types::{CurveState, TokenInfo};

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn cp_pool(reserve0: u128, reserve1: u128, tvl: Decimal) -> PoolSnapshot {
        PoolSnapshot {
            address: addr(0xAA),
            token0: TokenInfo::new(addr(1), "AAA", 18),
            token1: TokenInfo::new(addr(2), "BBB", 18),
            fee_bps: 30,
            curve: CurveState::ConstantProduct {
                reserve0: U256::from(reserve0),
                reserve1: U256::from(reserve1),
            },
            tvl_usd: tvl,
            last_block: 1,
            active: true,
        }
    }

    #[test]
    fn weighting_favors_the_deep_pool() {
        // Price 2.0 with weight 900, price 4.0 with weight 100.
        let pools = vec![
            cp_pool(1_000, 2_000, dec!(900)),
            cp_pool(1_000, 4_000, dec!(100)),
        ];

        let price = aggregate_spot_price(&pools, addr(1), addr(2)).unwrap();
        assert!((price - 2.2).abs() < 1e-9);
    }

    #[test]
    fn reverse_direction_inverts() {
        let pools = vec![cp_pool(1_000, 2_000, dec!(100))];

        let forward = aggregate_spot_price(&pools, addr(1), addr(2)).unwrap();
        let reverse = aggregate_spot_price(&pools, addr(2), addr(1)).unwrap();

        assert!((forward - 2.0).abs() < 1e-9);
        assert!((reverse - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unpriceable_pools_are_skipped_not_fatal() {
        let pools = vec![cp_pool(0, 0, dec!(900)), cp_pool(1_000, 2_000, dec!(100))];

        let price = aggregate_spot_price(&pools, addr(1), addr(2)).unwrap();
        assert!((price - 2.0).abs() < 1e-9);
    }

    #[test]
    fn no_priceable_pool_is_no_liquidity() {
        let pools = vec![cp_pool(0, 0, dec!(900))];
        let result = aggregate_spot_price(&pools, addr(1), addr(2));
        assert!(matches!(
            result,
            Err(SimulationError::NoLiquidity { .. })
        ));
    }

    #[test]
    fn zero_tvl_falls_back_to_plain_average() {
        let pools = vec![
            cp_pool(1_000, 2_000, Decimal::ZERO),
            cp_pool(1_000, 4_000, Decimal::ZERO),
        ];

        let price = aggregate_spot_price(&pools, addr(1), addr(2)).unwrap();
        assert!((price - 3.0).abs() < 1e-9);
    }
}
