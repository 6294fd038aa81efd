//! Batch quote orchestration.
//!
//! A batch request is N amounts against M eligible pools. Each pool is
//! simulated on its own task over a cloned snapshot, so pools price in
//! parallel and a panic or slow curve in one pool cannot affect another.
//! Per-amount failures collapse to the (0, 0) sentinel instead of failing
//! the batch; callers treat a zero-output row as unroutable.

use alloy_primitives::{Address, U256};
use futures::future::join_all;
use tracing::debug;

use poolsim_amm::MathError;
use sim_types::PoolSnapshot;

/// Quote results for one pool across the whole amount batch. `amounts_out`
/// and `gas_used` are parallel to the request's amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountOutResult {
    pub pool: Address,
    pub amounts_out: Vec<U256>,
    pub gas_used: Vec<u64>,
}

fn quote_one_pool(pool: &PoolSnapshot, token_in: Address, amounts: &[U256]) -> AmountOutResult {
    let mut amounts_out = Vec::with_capacity(amounts.len());
    let mut gas_used = Vec::with_capacity(amounts.len());

    for &amount in amounts {
        match poolsim_amm::quote(pool, token_in, amount) {
            Ok(quote) => {
                amounts_out.push(quote.amount_out);
                gas_used.push(quote.gas);
            }
            Err(MathError::InsufficientLiquidity) => {
                debug!(pool = %pool.address, %amount, "amount exceeds pool liquidity");
                amounts_out.push(U256::ZERO);
                gas_used.push(0);
            }
            Err(e) => {
                debug!(pool = %pool.address, %amount, error = %e, "quote failed");
                amounts_out.push(U256::ZERO);
                gas_used.push(0);
            }
        }
    }

    AmountOutResult {
        pool: pool.address,
        amounts_out,
        gas_used,
    }
}

/// Simulates every amount against every pool. Results come back in the same
/// order as `pools` regardless of task completion order.
pub async fn batch_quotes(
    pools: Vec<PoolSnapshot>,
    token_in: Address,
    amounts: Vec<U256>,
) -> Vec<AmountOutResult> {
    let amounts = std::sync::Arc::new(amounts);

    let handles: Vec<_> = pools
        .into_iter()
        .map(|pool| {
            let address = pool.address;
            let amounts = std::sync::Arc::clone(&amounts);
            let handle = tokio::spawn(async move { quote_one_pool(&pool, token_in, &amounts) });
            (address, handle)
        })
        .collect();

    // join_all preserves spawn order; a panicked pool task degrades to an
    // all-sentinel row.
    let (addresses, tasks): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let mut results = Vec::with_capacity(addresses.len());
    for (pool, joined) in addresses.into_iter().zip(join_all(tasks).await) {
        match joined {
            Ok(quotes) => results.push(quotes),
            Err(e) => {
                debug!(%pool, error = %e, "pool quote task failed");
                results.push(AmountOutResult {
                    pool,
                    amounts_out: vec![U256::ZERO; amounts.len()],
                    gas_used: vec![0; amounts.len()],
                });
            }
        }
    }
    results
}
