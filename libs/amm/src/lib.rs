//! # PoolSim AMM Library - Exact Swap Mathematics Engine
//!
//! ## Purpose
//!
//! Mathematical core for simulating swaps against in-memory pool state.
//! Implements exact integer arithmetic for constant-product, concentrated
//! liquidity, and StableSwap curves, with truncating division everywhere an
//! on-chain implementation truncates, so simulated outputs match venue
//! results unit for unit.
//!
//! ## Integration Points
//!
//! - **Input Sources**: Pool snapshots from the state store, trade parameters
//!   from the simulation client
//! - **Output Destinations**: Quote orchestrator, spot price aggregation
//! - **Curve Support**: Constant product (V2 style), concentrated liquidity
//!   (V3 style tick walking), two-token StableSwap
//! - **Precision**: 256-bit integer arithmetic with 512-bit intermediates,
//!   no floating point in any amount path
//!
//! ## Architecture Role
//!
//! This library is pure computation: no I/O, no locking, no shared state.
//! Callers pass an owned or borrowed [`PoolSnapshot`] and get back a quote
//! or an error. Every quote also carries a deterministic gas estimate so
//! downstream consumers can rank routes by net output.

pub mod concentrated;
pub mod constant_product;
pub mod error;
pub mod math;
pub mod stable_swap;

pub use error::MathError;

use alloy_primitives::{Address, U256};
use sim_types::{CurveState, PoolSnapshot, PoolVariant};

use crate::math::u256_to_f64;

/// A simulated exact-input swap result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub amount_out: U256,
    /// Deterministic gas estimate for executing this swap on chain.
    pub gas: u64,
}

/// Base gas estimate for a swap on the given curve type.
pub fn base_gas(variant: PoolVariant) -> u64 {
    match variant {
        PoolVariant::ConstantProduct => constant_product::BASE_GAS,
        PoolVariant::ConcentratedLiquidity => concentrated::BASE_GAS,
        PoolVariant::StableSwap => stable_swap::BASE_GAS,
    }
}

/// Simulates swapping `amount_in` of `token_in` against the pool.
///
/// The direction is inferred from which side of the pair `token_in` sits on.
/// A zero input is a valid no-op quote and still carries the base gas cost.
pub fn quote(pool: &PoolSnapshot, token_in: Address, amount_in: U256) -> Result<Quote, MathError> {
    let zero_for_one = if token_in == pool.token0.address {
        true
    } else if token_in == pool.token1.address {
        false
    } else {
        return Err(MathError::InvalidState("input token not in pool"));
    };

    let gas = base_gas(pool.curve.variant());
    if amount_in.is_zero() {
        return Ok(Quote {
            amount_out: U256::ZERO,
            gas,
        });
    }

    match &pool.curve {
        CurveState::ConstantProduct { reserve0, reserve1 } => {
            let (reserve_in, reserve_out) = if zero_for_one {
                (*reserve0, *reserve1)
            } else {
                (*reserve1, *reserve0)
            };
            let amount_out =
                constant_product::amount_out(amount_in, reserve_in, reserve_out, pool.fee_bps)?;
            Ok(Quote { amount_out, gas })
        }
        CurveState::Concentrated {
            sqrt_price_x96,
            tick,
            liquidity,
            ticks,
            ..
        } => {
            let (amount_out, ticks_crossed) = concentrated::swap(
                *sqrt_price_x96,
                *tick,
                *liquidity,
                ticks,
                pool.fee_bps,
                zero_for_one,
                amount_in,
            )?;
            Ok(Quote {
                amount_out,
                gas: gas + ticks_crossed as u64 * concentrated::GAS_PER_TICK,
            })
        }
        CurveState::Stable {
            reserve0,
            reserve1,
            amp,
        } => {
            let (reserve_in, reserve_out, decimals_in, decimals_out) = if zero_for_one {
                (*reserve0, *reserve1, pool.token0.decimals, pool.token1.decimals)
            } else {
                (*reserve1, *reserve0, pool.token1.decimals, pool.token0.decimals)
            };
            let amount_out = stable_swap::amount_out(
                amount_in,
                reserve_in,
                reserve_out,
                decimals_in,
                decimals_out,
                *amp,
                pool.fee_bps,
            )?;
            Ok(Quote { amount_out, gas })
        }
    }
}

/// Marginal price of one unit of token0 denominated in token1, adjusted for
/// token decimals. Fees are excluded.
pub fn spot_price(pool: &PoolSnapshot) -> Result<f64, MathError> {
    let decimal_shift =
        10f64.powi(pool.token0.decimals as i32 - pool.token1.decimals as i32);

    let price = match &pool.curve {
        CurveState::ConstantProduct { reserve0, reserve1 } => {
            if reserve0.is_zero() || reserve1.is_zero() {
                return Err(MathError::InsufficientLiquidity);
            }
            u256_to_f64(*reserve1) / u256_to_f64(*reserve0) * decimal_shift
        }
        CurveState::Concentrated {
            sqrt_price_x96,
            liquidity,
            ..
        } => {
            if *liquidity == 0 || sqrt_price_x96.is_zero() {
                return Err(MathError::InsufficientLiquidity);
            }
            let sqrt_price = u256_to_f64(*sqrt_price_x96) / 2f64.powi(96);
            sqrt_price * sqrt_price * decimal_shift
        }
        CurveState::Stable {
            reserve0,
            reserve1,
            amp,
        } => {
            if reserve0.is_zero() || reserve1.is_zero() {
                return Err(MathError::InsufficientLiquidity);
            }
            // Fee-free probe with one whole unit of token0.
            let unit = U256::from(10u64).pow(U256::from(pool.token0.decimals));
            let out = stable_swap::amount_out(
                unit,
                *reserve0,
                *reserve1,
                pool.token0.decimals,
                pool.token1.decimals,
                *amp,
                0,
            )?;
            u256_to_f64(out) / 10f64.powi(pool.token1.decimals as i32)
        }
    };

    if !price.is_finite() || price <= 0.0 {
        return Err(MathError::InvalidState("degenerate spot price"));
    }
    Ok(price)
}
