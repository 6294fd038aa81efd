//! Pool eligibility filtering for quoting and pricing.

use rust_decimal::Decimal;

use sim_types::{Address, PoolSnapshot};
use state_pools::PoolStateStore;

/// Whether a pool participates in quoting at all.
///
/// Removed pools stay in the store for history but never price; pools with
/// no tradeable liquidity or below the TVL floor are skipped the same way.
pub fn is_eligible(pool: &PoolSnapshot, tvl_threshold_usd: Decimal) -> bool {
    pool.active && pool.curve.is_quotable() && pool.tvl_usd >= tvl_threshold_usd
}

/// Eligible pools serving the pair, in pool insertion order.
pub fn eligible_pools(
    store: &PoolStateStore,
    a: Address,
    b: Address,
    tvl_threshold_usd: Decimal,
) -> Vec<PoolSnapshot> {
    store
        .pools_for_pair(a, b)
        .into_iter()
        .filter(|pool| is_eligible(pool, tvl_threshold_usd))
        .collect()
}
