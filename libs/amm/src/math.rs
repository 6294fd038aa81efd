//! Full-precision 256-bit helpers shared by the formula modules.
//!
//! All swap math rounds toward zero unless a variant explicitly needs
//! round-up semantics (input-side deltas in the concentrated walk), matching
//! on-chain settlement behavior.

use alloy_primitives::{U256, U512};

use crate::error::MathError;

/// Narrows a 512-bit intermediate back to 256 bits.
fn narrow(wide: U512, context: &'static str) -> Result<U256, MathError> {
    let limbs = wide.into_limbs();
    if limbs[4..].iter().any(|&limb| limb != 0) {
        return Err(MathError::Overflow(context));
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Computes `a * b / denominator` with 512-bit intermediates, truncating.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero("mul_div"));
    }

    let wide = U512::from(a) * U512::from(b) / U512::from(denominator);
    narrow(wide, "mul_div")
}

/// Like [`mul_div`], rounding up on a non-zero remainder.
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero("mul_div_rounding_up"));
    }

    let product = U512::from(a) * U512::from(b);
    let (quotient, remainder) = product.div_rem(U512::from(denominator));
    let wide = if remainder.is_zero() {
        quotient
    } else {
        quotient + U512::from(1u8)
    };
    narrow(wide, "mul_div_rounding_up")
}

/// `a / b` rounded up. Errors on `b == 0` instead of panicking.
pub fn div_rounding_up(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero("div_rounding_up"));
    }
    let (quotient, remainder) = a.div_rem(b);
    Ok(if remainder.is_zero() {
        quotient
    } else {
        quotient + U256::ONE
    })
}

/// Lossy conversion for spot-price reporting only; never used in swap math.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .into_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 2f64.powi(64) + limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_truncates() {
        // 7 * 10 / 8 = 8.75 -> 8
        let result = mul_div(U256::from(7u8), U256::from(10u8), U256::from(8u8)).unwrap();
        assert_eq!(result, U256::from(8u8));
    }

    #[test]
    fn mul_div_survives_wide_intermediates() {
        // max * max / max = max: the product needs 512 bits
        assert_eq!(mul_div(U256::MAX, U256::MAX, U256::MAX).unwrap(), U256::MAX);
    }

    #[test]
    fn mul_div_reports_overflow_and_zero_division() {
        assert_eq!(
            mul_div(U256::MAX, U256::from(2u8), U256::ONE),
            Err(MathError::Overflow("mul_div"))
        );
        assert_eq!(
            mul_div(U256::ONE, U256::ONE, U256::ZERO),
            Err(MathError::DivisionByZero("mul_div"))
        );
    }

    #[test]
    fn rounding_up_variants() {
        assert_eq!(
            mul_div_rounding_up(U256::from(7u8), U256::from(10u8), U256::from(3u8)).unwrap(),
            U256::from(24u8)
        );
        assert_eq!(
            div_rounding_up(U256::from(10u8), U256::from(3u8)).unwrap(),
            U256::from(4u8)
        );
        assert_eq!(
            div_rounding_up(U256::from(10u8), U256::from(5u8)).unwrap(),
            U256::from(2u8)
        );
    }

    #[test]
    fn f64_conversion_is_close_enough_for_prices() {
        let v = U256::from(1_000_000_000_000_000_000u128); // 1e18
        let f = u256_to_f64(v);
        assert!((f - 1e18).abs() / 1e18 < 1e-12);
    }
}
