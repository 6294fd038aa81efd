//! Constant-product (x·y = k) swap math.
//!
//! The fee is deducted from the input before the invariant formula is
//! applied, and every division truncates toward zero:
//!
//! `out = in_fee * reserve_out / (reserve_in * 10000 + in_fee)`
//! where `in_fee = amount_in * (10000 - fee_bps)`.

use alloy_primitives::U256;

use crate::error::MathError;
use crate::math::mul_div;

/// Fixed gas estimate for a constant-product swap.
pub const BASE_GAS: u64 = 120_000;

pub(crate) const BPS_DENOMINATOR: u64 = 10_000;

/// Exact output for `amount_in` against the given reserves.
pub fn amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Result<U256, MathError> {
    if fee_bps as u64 >= BPS_DENOMINATOR {
        return Err(MathError::InvalidState("fee_bps >= 10000"));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(MathError::InsufficientLiquidity);
    }
    if amount_in.is_zero() {
        return Ok(U256::ZERO);
    }

    let fee_multiplier = U256::from(BPS_DENOMINATOR - fee_bps as u64);
    let amount_in_with_fee = amount_in
        .checked_mul(fee_multiplier)
        .ok_or(MathError::Overflow("fee application"))?;

    let denominator = reserve_in
        .checked_mul(U256::from(BPS_DENOMINATOR))
        .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
        .ok_or(MathError::Overflow("constant product denominator"))?;

    let out = mul_div(amount_in_with_fee, reserve_out, denominator)?;

    // The formula asymptotically approaches reserve_out; equality can only
    // come from corrupt state, but a swap may never drain the reserve.
    if out >= reserve_out {
        return Err(MathError::InsufficientLiquidity);
    }

    Ok(out)
}
