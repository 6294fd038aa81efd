//! StableSwap invariant math for two-token pools.
//!
//! Reserves are normalized to 18 decimals before solving the invariant and
//! the output is scaled back down, truncating. Both Newton iterations bound
//! their loop count and treat a one-unit oscillation as converged.

use alloy_primitives::U256;

use crate::constant_product::BPS_DENOMINATOR;
use crate::error::MathError;
use crate::math::mul_div;

/// Gas estimate for a stable-swap quote.
pub const BASE_GAS: u64 = 180_000;

const N_COINS: u64 = 2;
const MAX_ITERATIONS: usize = 64;
const NORMALIZED_DECIMALS: u8 = 18;

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

fn normalize(value: U256, decimals: u8) -> Result<U256, MathError> {
    if decimals < NORMALIZED_DECIMALS {
        let scale = pow10((NORMALIZED_DECIMALS - decimals) as u32);
        value
            .checked_mul(scale)
            .ok_or(MathError::Overflow("reserve normalization"))
    } else if decimals > NORMALIZED_DECIMALS {
        Ok(value / pow10((decimals - NORMALIZED_DECIMALS) as u32))
    } else {
        Ok(value)
    }
}

fn denormalize(value: U256, decimals: u8) -> Result<U256, MathError> {
    if decimals < NORMALIZED_DECIMALS {
        Ok(value / pow10((NORMALIZED_DECIMALS - decimals) as u32))
    } else if decimals > NORMALIZED_DECIMALS {
        value
            .checked_mul(pow10((decimals - NORMALIZED_DECIMALS) as u32))
            .ok_or(MathError::Overflow("output denormalization"))
    } else {
        Ok(value)
    }
}

fn abs_diff(a: U256, b: U256) -> U256 {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Solves for the invariant D given normalized balances.
fn get_d(xp0: U256, xp1: U256, amp: u64) -> Result<U256, MathError> {
    let sum = xp0
        .checked_add(xp1)
        .ok_or(MathError::Overflow("balance sum"))?;
    if sum.is_zero() {
        return Ok(U256::ZERO);
    }

    let n = U256::from(N_COINS);
    let ann = U256::from(amp)
        .checked_mul(n)
        .ok_or(MathError::Overflow("ann"))?;

    let mut d = sum;
    for _ in 0..MAX_ITERATIONS {
        // d_p = d^3 / (n^2 * xp0 * xp1), split to stay within 256 bits.
        let d_p = mul_div(
            mul_div(d, d, xp0.checked_mul(n).ok_or(MathError::Overflow("xp0 * n"))?)?,
            d,
            xp1.checked_mul(n).ok_or(MathError::Overflow("xp1 * n"))?,
        )?;

        let d_prev = d;
        let numerator = d
            .checked_mul(
                ann.checked_mul(sum)
                    .and_then(|v| v.checked_add(d_p.checked_mul(n)?))
                    .ok_or(MathError::Overflow("d numerator"))?,
            )
            .ok_or(MathError::Overflow("d numerator"))?;
        let denominator = (ann - U256::ONE)
            .checked_mul(d)
            .and_then(|v| v.checked_add((n + U256::ONE).checked_mul(d_p)?))
            .ok_or(MathError::Overflow("d denominator"))?;
        if denominator.is_zero() {
            return Err(MathError::DivisionByZero("d denominator"));
        }

        d = numerator / denominator;
        if abs_diff(d, d_prev) <= U256::ONE {
            break;
        }
    }
    Ok(d)
}

/// Solves for the post-trade balance of the output token given the new
/// input-side balance `x` and the invariant `d`.
fn get_y(x: U256, d: U256, amp: u64) -> Result<U256, MathError> {
    if x.is_zero() {
        return Err(MathError::DivisionByZero("input balance"));
    }

    let n = U256::from(N_COINS);
    let ann = U256::from(amp)
        .checked_mul(n)
        .ok_or(MathError::Overflow("ann"))?;

    // c = d^3 / (n^2 * x * ann)
    let c = mul_div(
        mul_div(d, d, x.checked_mul(n).ok_or(MathError::Overflow("x * n"))?)?,
        d,
        ann.checked_mul(n).ok_or(MathError::Overflow("ann * n"))?,
    )?;
    let b = x
        .checked_add(d / ann)
        .ok_or(MathError::Overflow("y offset"))?;

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let numerator = y
            .checked_mul(y)
            .and_then(|v| v.checked_add(c))
            .ok_or(MathError::Overflow("y numerator"))?;
        let denominator = y
            .checked_mul(U256::from(2u64))
            .and_then(|v| v.checked_add(b))
            .and_then(|v| v.checked_sub(d))
            .ok_or(MathError::InvalidState("y denominator"))?;
        if denominator.is_zero() {
            return Err(MathError::DivisionByZero("y denominator"));
        }

        let y_next = numerator / denominator;
        let converged = abs_diff(y_next, y) <= U256::ONE;
        y = y_next;
        if converged {
            break;
        }
    }
    Ok(y)
}

/// Exact-input quote against the StableSwap invariant.
///
/// The fee is charged on the input amount before it enters the curve.
pub fn amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    decimals_in: u8,
    decimals_out: u8,
    amp: u64,
    fee_bps: u32,
) -> Result<U256, MathError> {
    if fee_bps as u64 >= BPS_DENOMINATOR {
        return Err(MathError::InvalidState("fee_bps >= 10000"));
    }
    if amp == 0 {
        return Err(MathError::InvalidState("amplification is zero"));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(MathError::InsufficientLiquidity);
    }
    if amount_in.is_zero() {
        return Ok(U256::ZERO);
    }

    let amount_in_after_fee = mul_div(
        amount_in,
        U256::from(BPS_DENOMINATOR - fee_bps as u64),
        U256::from(BPS_DENOMINATOR),
    )?;

    let xp_in = normalize(reserve_in, decimals_in)?;
    let xp_out = normalize(reserve_out, decimals_out)?;
    let dx = normalize(amount_in_after_fee, decimals_in)?;

    let d = get_d(xp_in, xp_out, amp)?;
    let new_xp_in = xp_in
        .checked_add(dx)
        .ok_or(MathError::Overflow("post-trade input balance"))?;
    let new_xp_out = get_y(new_xp_in, d, amp)?;

    let dy = xp_out
        .checked_sub(new_xp_out)
        .ok_or(MathError::InsufficientLiquidity)?;

    let out = denormalize(dy, decimals_out)?;
    if out >= reserve_out {
        return Err(MathError::InsufficientLiquidity);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    const ONE_18: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn balanced_pool_trades_near_parity() {
        // 1M/1M 18-decimal pool with amp 2000, no fee: 1000 units in should
        // return very close to 1000 units out.
        let reserve = u(1_000_000 * ONE_18);
        let amount = u(1_000 * ONE_18);

        let out = amount_out(amount, reserve, reserve, 18, 18, 2000, 0).unwrap();

        assert!(out <= amount);
        // Within 0.1% of parity.
        assert!(out > amount - amount / u(1000));
    }

    #[test]
    fn fee_reduces_output() {
        let reserve = u(1_000_000 * ONE_18);
        let amount = u(1_000 * ONE_18);

        let gross = amount_out(amount, reserve, reserve, 18, 18, 2000, 0).unwrap();
        let net = amount_out(amount, reserve, reserve, 18, 18, 2000, 30).unwrap();

        assert!(net < gross);
    }

    #[test]
    fn mixed_decimals_scale_correctly() {
        // 6-decimal token against an 18-decimal token, balanced in value.
        let reserve_6 = u(1_000_000_000_000); // 1M with 6 decimals
        let reserve_18 = u(1_000_000 * ONE_18);
        let amount = u(1_000_000_000); // 1000 units, 6 decimals

        let out = amount_out(amount, reserve_6, reserve_18, 6, 18, 2000, 0).unwrap();

        // Output is in 18-decimal units and close to 1000 units.
        assert!(out > u(999 * ONE_18));
        assert!(out <= u(1_000 * ONE_18));
    }

    #[test]
    fn imbalanced_pool_penalizes_the_heavy_side() {
        // Adding more of the over-supplied token earns less than parity.
        let heavy = u(2_000_000 * ONE_18);
        let light = u(500_000 * ONE_18);
        let amount = u(10_000 * ONE_18);

        let out = amount_out(amount, heavy, light, 18, 18, 100, 0).unwrap();
        assert!(out < amount);
    }

    #[test]
    fn empty_reserves_reject() {
        let result = amount_out(u(1000), U256::ZERO, u(1000), 18, 18, 2000, 30);
        assert_eq!(result, Err(MathError::InsufficientLiquidity));
    }

    #[test]
    fn zero_amp_rejects() {
        let result = amount_out(u(1000), u(1000), u(1000), 18, 18, 0, 30);
        assert!(matches!(result, Err(MathError::InvalidState(_))));
    }

    #[test]
    fn zero_input_is_zero_output() {
        let reserve = u(1_000_000 * ONE_18);
        let out = amount_out(U256::ZERO, reserve, reserve, 18, 18, 2000, 30).unwrap();
        assert_eq!(out, U256::ZERO);
    }

    #[test]
    fn invariant_solver_converges_on_balanced_pool() {
        let xp = u(1_000_000 * ONE_18);
        let d = get_d(xp, xp, 2000).unwrap();

        // For a balanced pool D equals the sum of balances (within rounding).
        let sum = xp * u(2);
        assert!(abs_diff(d, sum) <= u(2));
    }
}
