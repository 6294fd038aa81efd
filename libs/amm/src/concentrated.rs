//! Concentrated-liquidity swap math (Q64.96 sqrt-price representation).
//!
//! A swap is executed as a sequence of steps, each bounded by the next
//! initialized tick in the direction of trade. Crossing a tick updates the
//! active liquidity by that tick's `liquidity_net` and adds a fixed gas
//! increment. Input-side deltas round up, output-side deltas round down, so
//! the simulated pool never under-collects.

use alloy_primitives::U256;

use crate::constant_product::BPS_DENOMINATOR;
use crate::error::MathError;
use crate::math::{div_rounding_up, mul_div, mul_div_rounding_up};
use sim_types::TickInfo;

/// Gas estimate for a swap that stays within the active tick range.
pub const BASE_GAS: u64 = 150_000;
/// Additional gas per initialized tick crossed.
pub const GAS_PER_TICK: u64 = 20_000;

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

const Q96_SHIFT: usize = 96;

/// Sqrt price (Q64.96) at a tick index.
pub fn sqrt_ratio_at_tick(tick: i32) -> Result<U256, MathError> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(MathError::InvalidState("tick out of bounds"));
    }

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737, 18445821805675392311, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    macro_rules! apply_multiplier {
        ($bit:expr, $l0:expr, $l1:expr) => {
            if abs_tick & $bit != 0 {
                ratio = ratio.wrapping_mul(U256::from_limbs([$l0, $l1, 0, 0])) >> 128;
            }
        };
    }

    apply_multiplier!(2, 6459403834229662010, 18444899583751176498);
    apply_multiplier!(4, 17226890335427755468, 18443055278223354162);
    apply_multiplier!(8, 2032852871939366096, 18439367220385604838);
    apply_multiplier!(16, 14545316742740207172, 18431993317065449817);
    apply_multiplier!(32, 5129152022828963008, 18417254355718160513);
    apply_multiplier!(64, 4894419605888772193, 18387811781193591352);
    apply_multiplier!(128, 1280255884321894483, 18329067761203520168);
    apply_multiplier!(256, 15924666964335305636, 18212142134806087854);
    apply_multiplier!(512, 8010504389359918676, 17980523815641551639);
    apply_multiplier!(1024, 10668036004952895731, 17526086738831147013);
    apply_multiplier!(2048, 4878133418470705625, 16651378430235024244);
    apply_multiplier!(4096, 9537173718739605541, 15030750278693429944);
    apply_multiplier!(8192, 9972618978014552549, 12247334978882834399);
    apply_multiplier!(16384, 10428997489610666743, 8131365268884726200);
    apply_multiplier!(32768, 9305304367709015974, 3584323654723342297);
    apply_multiplier!(65536, 14301143598189091785, 696457651847595233);
    apply_multiplier!(131072, 7393154844743099908, 26294789957452057);
    apply_multiplier!(262144, 2209338891292245656, 37481735321082);
    apply_multiplier!(524288, 10518117631919034274, 76158723);

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Round Q128.128 up into Q64.96.
    let round_up = (ratio.as_limbs()[0] & 0xFFFF_FFFF) != 0;
    Ok((ratio >> 32) + U256::from(round_up as u64))
}

/// token0 amount between two sqrt prices: `L << 96 * (b - a) / b / a`.
fn amount0_delta(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    let (lo, hi) = if sqrt_a <= sqrt_b {
        (sqrt_a, sqrt_b)
    } else {
        (sqrt_b, sqrt_a)
    };
    if lo.is_zero() {
        return Err(MathError::InvalidState("sqrt price is zero"));
    }

    let numerator1 = U256::from(liquidity) << Q96_SHIFT;
    let numerator2 = hi - lo;

    if round_up {
        div_rounding_up(mul_div_rounding_up(numerator1, numerator2, hi)?, lo)
    } else {
        Ok(mul_div(numerator1, numerator2, hi)? / lo)
    }
}

/// token1 amount between two sqrt prices: `L * (b - a) / 2^96`.
fn amount1_delta(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    let (lo, hi) = if sqrt_a <= sqrt_b {
        (sqrt_a, sqrt_b)
    } else {
        (sqrt_b, sqrt_a)
    };
    let q96 = U256::ONE << Q96_SHIFT;

    if round_up {
        mul_div_rounding_up(U256::from(liquidity), hi - lo, q96)
    } else {
        mul_div(U256::from(liquidity), hi - lo, q96)
    }
}

/// Next sqrt price after consuming `amount_in` of the input token.
fn next_sqrt_price_from_input(
    sqrt_price: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, MathError> {
    if sqrt_price.is_zero() {
        return Err(MathError::InvalidState("sqrt price is zero"));
    }
    if liquidity == 0 {
        return Err(MathError::InsufficientLiquidity);
    }
    if amount_in.is_zero() {
        return Ok(sqrt_price);
    }

    let numerator1 = U256::from(liquidity) << Q96_SHIFT;

    if zero_for_one {
        // Price decreases; round up so we never overstate the move.
        match amount_in.checked_mul(sqrt_price) {
            Some(product) => {
                let denominator = numerator1
                    .checked_add(product)
                    .ok_or(MathError::Overflow("next sqrt price denominator"))?;
                mul_div_rounding_up(numerator1, sqrt_price, denominator)
            }
            None => div_rounding_up(numerator1, (numerator1 / sqrt_price) + amount_in),
        }
    } else {
        // Price increases by amount / liquidity in Q96.
        let quotient = mul_div(amount_in, U256::ONE << Q96_SHIFT, U256::from(liquidity))?;
        sqrt_price
            .checked_add(quotient)
            .ok_or(MathError::Overflow("next sqrt price"))
    }
}

/// One bounded swap step toward `sqrt_target`.
///
/// Returns `(sqrt_next, amount_in, amount_out, fee_amount)` where `amount_in`
/// excludes the fee.
fn compute_swap_step(
    sqrt_current: U256,
    sqrt_target: U256,
    liquidity: u128,
    amount_remaining: U256,
    fee_bps: u32,
) -> Result<(U256, U256, U256, U256), MathError> {
    let zero_for_one = sqrt_target < sqrt_current;
    let fee = U256::from(fee_bps as u64);
    let fee_complement = U256::from(BPS_DENOMINATOR - fee_bps as u64);

    let amount_remaining_less_fee = mul_div(
        amount_remaining,
        fee_complement,
        U256::from(BPS_DENOMINATOR),
    )?;

    let amount_in_to_target = if zero_for_one {
        amount0_delta(sqrt_target, sqrt_current, liquidity, true)?
    } else {
        amount1_delta(sqrt_current, sqrt_target, liquidity, true)?
    };

    let (sqrt_next, amount_in) = if amount_remaining_less_fee >= amount_in_to_target {
        (sqrt_target, amount_in_to_target)
    } else {
        let next = next_sqrt_price_from_input(
            sqrt_current,
            liquidity,
            amount_remaining_less_fee,
            zero_for_one,
        )?;
        (next, amount_remaining_less_fee)
    };

    let reached_target = sqrt_next == sqrt_target;

    let amount_out = if zero_for_one {
        amount1_delta(sqrt_next, sqrt_current, liquidity, false)?
    } else {
        amount0_delta(sqrt_current, sqrt_next, liquidity, false)?
    };

    let fee_amount = if reached_target {
        mul_div_rounding_up(amount_in, fee, fee_complement)?
    } else {
        // Everything the step did not consume as principal is taken as fee.
        amount_remaining - amount_in
    };

    Ok((sqrt_next, amount_in, amount_out, fee_amount))
}

/// Simulates an exact-input swap, walking initialized ticks as needed.
///
/// `ticks` must be sorted ascending by index. Returns the total output and
/// the number of initialized ticks crossed.
pub fn swap(
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    ticks: &[TickInfo],
    fee_bps: u32,
    zero_for_one: bool,
    amount_in: U256,
) -> Result<(U256, u32), MathError> {
    if fee_bps as u64 >= BPS_DENOMINATOR {
        return Err(MathError::InvalidState("fee_bps >= 10000"));
    }
    if sqrt_price_x96 <= MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(MathError::InvalidState("sqrt price out of bounds"));
    }
    if amount_in.is_zero() {
        return Ok((U256::ZERO, 0));
    }
    if liquidity == 0 {
        return Err(MathError::InsufficientLiquidity);
    }

    let mut remaining = amount_in;
    let mut amount_out = U256::ZERO;
    let mut sqrt_price = sqrt_price_x96;
    let mut current_tick = tick;
    let mut active_liquidity = liquidity;
    let mut crossed = 0u32;

    while !remaining.is_zero() {
        if active_liquidity == 0 {
            return Err(MathError::InsufficientLiquidity);
        }

        let next_tick = next_initialized_tick(ticks, current_tick, zero_for_one);
        let sqrt_target = match next_tick {
            Some(t) => sqrt_ratio_at_tick(t.index)?,
            // No more initialized ticks: the range boundary is the hard end
            // of tradeable liquidity.
            None if zero_for_one => MIN_SQRT_RATIO + U256::ONE,
            None => MAX_SQRT_RATIO - U256::ONE,
        };

        let (sqrt_next, step_in, step_out, step_fee) =
            compute_swap_step(sqrt_price, sqrt_target, active_liquidity, remaining, fee_bps)?;

        let consumed = step_in
            .checked_add(step_fee)
            .ok_or(MathError::Overflow("step consumption"))?;
        remaining = remaining.saturating_sub(consumed);
        amount_out = amount_out
            .checked_add(step_out)
            .ok_or(MathError::Overflow("accumulated output"))?;
        sqrt_price = sqrt_next;

        if sqrt_next == sqrt_target {
            match next_tick {
                Some(t) => {
                    active_liquidity = cross_tick(active_liquidity, t, zero_for_one)?;
                    crossed += 1;
                    current_tick = if zero_for_one { t.index - 1 } else { t.index };
                }
                None => {
                    // Hit the absolute range boundary with input left over.
                    if !remaining.is_zero() {
                        return Err(MathError::InsufficientLiquidity);
                    }
                }
            }
        } else if consumed.is_zero() {
            // No progress possible; treat as drained liquidity.
            return Err(MathError::InsufficientLiquidity);
        }
    }

    Ok((amount_out, crossed))
}

/// Next initialized tick strictly in the direction of trade.
///
/// Mirrors the tick-bitmap convention: selling token0 searches at-or-below
/// the current tick, selling token1 searches strictly above.
fn next_initialized_tick(ticks: &[TickInfo], current: i32, zero_for_one: bool) -> Option<TickInfo> {
    if zero_for_one {
        ticks.iter().rev().find(|t| t.index <= current).copied()
    } else {
        ticks.iter().find(|t| t.index > current).copied()
    }
}

fn cross_tick(liquidity: u128, tick: TickInfo, zero_for_one: bool) -> Result<u128, MathError> {
    // liquidity_net is signed for left-to-right crossings; moving down the
    // price curve applies the negation.
    let net = if zero_for_one {
        tick.liquidity_net.checked_neg()
    } else {
        Some(tick.liquidity_net)
    }
    .ok_or(MathError::Overflow("liquidity_net negation"))?;

    let updated = if net >= 0 {
        liquidity.checked_add(net as u128)
    } else {
        liquidity.checked_sub(net.unsigned_abs())
    };

    updated.ok_or(MathError::InvalidState("negative liquidity after crossing"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // sqrt price for tick 0: exactly 2^96 (price = 1.0)
    fn price_one() -> U256 {
        U256::ONE << 96
    }

    #[test]
    fn sqrt_ratio_spans_tick_bounds() {
        assert_eq!(sqrt_ratio_at_tick(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(sqrt_ratio_at_tick(0).unwrap(), price_one());
        assert!(sqrt_ratio_at_tick(MAX_TICK).unwrap() <= MAX_SQRT_RATIO);
        assert!(sqrt_ratio_at_tick(MAX_TICK + 1).is_err());
    }

    #[test]
    fn sqrt_ratio_is_monotone_in_tick() {
        let mut prev = sqrt_ratio_at_tick(-100).unwrap();
        for tick in -99..=100 {
            let next = sqrt_ratio_at_tick(tick).unwrap();
            assert!(next > prev, "tick {tick} not monotone");
            prev = next;
        }
    }

    #[test]
    fn small_swap_within_range() {
        let liquidity = 1_000_000_000_000u128;
        let ticks = vec![
            TickInfo {
                index: -600,
                liquidity_net: 1_000_000_000_000,
            },
            TickInfo {
                index: 600,
                liquidity_net: -1_000_000_000_000,
            },
        ];

        let (out, crossed) = swap(
            price_one(),
            0,
            liquidity,
            &ticks,
            30,
            true,
            U256::from(1_000_000u64),
        )
        .unwrap();

        // Near price 1.0 a small trade returns roughly its input less fees.
        assert!(out > U256::from(990_000u64));
        assert!(out < U256::from(1_000_000u64));
        assert_eq!(crossed, 0);
    }

    #[test]
    fn large_swap_crosses_initialized_ticks() {
        let liquidity = 1_000_000_000_000u128;
        // A band of ticks below the current price, each shedding liquidity.
        let ticks = vec![
            TickInfo {
                index: -100,
                liquidity_net: 400_000_000_000,
            },
            TickInfo {
                index: -50,
                liquidity_net: 300_000_000_000,
            },
            TickInfo {
                index: 100,
                liquidity_net: -700_000_000_000,
            },
        ];

        // Push enough volume through to cross the -50 and -100 ticks.
        let (out, crossed) = swap(
            price_one(),
            0,
            liquidity,
            &ticks,
            30,
            true,
            U256::from(12_000_000_000u64),
        )
        .unwrap();

        assert!(out > U256::ZERO);
        assert!(crossed >= 1, "expected at least one tick crossing");
    }

    #[test]
    fn zero_liquidity_is_insufficient() {
        let result = swap(
            price_one(),
            0,
            0,
            &[],
            30,
            true,
            U256::from(1000u64),
        );
        assert_eq!(result, Err(MathError::InsufficientLiquidity));
    }

    #[test]
    fn draining_past_last_tick_is_insufficient() {
        // Tiny in-range liquidity, no ticks to fall back on.
        let result = swap(
            price_one(),
            0,
            1_000u128,
            &[],
            30,
            true,
            U256::from(u128::MAX),
        );
        assert_eq!(result, Err(MathError::InsufficientLiquidity));
    }

    #[test]
    fn zero_amount_is_zero_out() {
        let (out, crossed) = swap(
            price_one(),
            0,
            1_000_000u128,
            &[],
            30,
            true,
            U256::ZERO,
        )
        .unwrap();
        assert_eq!(out, U256::ZERO);
        assert_eq!(crossed, 0);
    }

    #[test]
    fn opposite_directions_move_price_opposite_ways() {
        let liquidity = 1_000_000_000_000u128;

        let down = next_sqrt_price_from_input(
            price_one(),
            liquidity,
            U256::from(1_000_000u64),
            true,
        )
        .unwrap();
        let up = next_sqrt_price_from_input(
            price_one(),
            liquidity,
            U256::from(1_000_000u64),
            false,
        )
        .unwrap();

        assert!(down < price_one());
        assert!(up > price_one());
    }
}
