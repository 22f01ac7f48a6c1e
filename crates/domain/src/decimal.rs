//! Deterministic fixed-point decimal helpers.
//!
//! All pool math funnels through this module so that every node applies
//! the same operand order, the same rounding strategy, and the same
//! precision truncation. Checked operations never panic; overflow and
//! zero division surface as [`MathError`].

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::MathError;

/// Checked addition.
///
/// # Errors
/// Returns [`MathError::Overflow`] if the sum is not representable.
pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

/// Checked subtraction.
///
/// # Errors
/// Returns [`MathError::Overflow`] if the difference is not representable.
pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

/// Checked multiplication.
///
/// # Errors
/// Returns [`MathError::Overflow`] if the product is not representable.
pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// Checked division.
///
/// # Errors
/// Returns [`MathError::DivisionByZero`] if `b` is zero and
/// [`MathError::Overflow`] if the quotient is not representable.
pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    a.checked_div(b).ok_or(MathError::Overflow)
}

/// Rounds toward zero at `dp` decimal places.
#[must_use]
pub fn round_down(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// Rounds away from zero at `dp` decimal places.
#[must_use]
pub fn round_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::AwayFromZero)
}

/// Rounds half away from zero at `dp` decimal places.
#[must_use]
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Number of fractional digits once trailing zeros are stripped.
#[must_use]
pub fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

/// 10^`n` as a decimal.
///
/// # Errors
/// Returns [`MathError::Overflow`] for exponents outside the decimal range.
pub fn pow10(n: u32) -> Result<Decimal, MathError> {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = mul(result, Decimal::TEN)?;
    }
    Ok(result)
}

/// Rounds `value` to `digits` significant digits, half away from zero.
///
/// This is the rounding used for the constant-product comparison: a pool
/// with precision 8 compares `k` values at 8 significant digits, so
/// rounding noise in the least significant places of a large product does
/// not break the invariant check. The exponent is derived by digit
/// counting, never by floating-point logarithms.
///
/// # Errors
/// Returns [`MathError::Overflow`] if rescaling overflows.
pub fn round_sig(value: Decimal, digits: u32) -> Result<Decimal, MathError> {
    if value.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let digits = digits.max(1);
    let dp = i64::from(digits) - 1 - i64::from(exponent(value));
    if dp >= 0 {
        // rust_decimal carries at most 28 fractional digits.
        let dp = dp.min(28) as u32;
        Ok(round_half_up(value, dp))
    } else {
        // Rounding left of the decimal point: scale down, round, scale back.
        let shift = pow10((-dp) as u32)?;
        let scaled = div(value, shift)?;
        mul(round_half_up(scaled, 0), shift)
    }
}

/// Deterministic square root via Newton's method.
///
/// Iterates `x' = (x + value/x) / 2` with a fixed convergence threshold
/// and iteration cap, so the result is identical on every platform.
///
/// # Errors
/// Returns [`MathError::NegativeRoot`] for negative input and
/// [`MathError::Overflow`] if an intermediate step overflows.
pub fn sqrt(value: Decimal) -> Result<Decimal, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::NegativeRoot);
    }
    if value.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let epsilon = Decimal::new(1, 18);
    let mut x = if value > Decimal::ONE {
        div(value, Decimal::TWO)?
    } else {
        Decimal::ONE
    };
    for _ in 0..128 {
        let next = div(
            x.checked_add(div(value, x)?).ok_or(MathError::Overflow)?,
            Decimal::TWO,
        )?;
        let step = next.checked_sub(x).ok_or(MathError::Overflow)?.abs();
        x = next;
        if step <= epsilon {
            break;
        }
    }
    Ok(x)
}

/// Decimal exponent of `value`: the power of ten of its leading digit.
///
/// `exponent(2_000_000) == 6`, `exponent(0.000123) == -4`. Caller
/// guarantees `value` is non-zero.
fn exponent(value: Decimal) -> i32 {
    let abs = value.abs();
    if abs >= Decimal::ONE {
        let mut e = 0;
        let mut t = abs.trunc();
        while t >= Decimal::TEN {
            t = (t / Decimal::TEN).trunc();
            e += 1;
        }
        e
    } else {
        let mut e = 0;
        let mut t = abs;
        while t < Decimal::ONE {
            t *= Decimal::TEN;
            e -= 1;
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rounding_directions() {
        assert_eq!(round_down(dec!(19.801980198), 8), dec!(19.80198019));
        assert_eq!(round_up(dec!(19.801980191), 8), dec!(19.80198020));
        assert_eq!(round_half_up(dec!(1.960592098), 8), dec!(1.96059210));
    }

    #[test]
    fn test_round_sig_large_value() {
        // k comparison from a precision-8 pool: noise beyond the eighth
        // significant digit must vanish.
        let k = round_sig(dec!(2000000.0000081), 8).unwrap();
        assert_eq!(k, dec!(2000000.0));
        assert_eq!(round_sig(dec!(2000000), 8).unwrap(), k);
    }

    #[test]
    fn test_round_sig_left_of_point() {
        assert_eq!(round_sig(dec!(123456789), 4).unwrap(), dec!(123500000));
        assert_eq!(round_sig(dec!(987654321), 2).unwrap(), dec!(990000000));
    }

    #[test]
    fn test_round_sig_small_value() {
        assert_eq!(round_sig(dec!(0.000123449), 4).unwrap(), dec!(0.0001234));
    }

    #[test]
    fn test_sqrt_values() {
        assert_eq!(round_half_up(sqrt(dec!(4)).unwrap(), 12), dec!(2));
        assert_eq!(
            round_half_up(sqrt(dec!(2000000)).unwrap(), 8),
            dec!(1414.21356237)
        );
    }

    #[test]
    fn test_sqrt_negative_rejected() {
        assert_eq!(sqrt(dec!(-1)), Err(MathError::NegativeRoot));
    }

    #[test]
    fn test_decimal_places_normalizes() {
        assert_eq!(decimal_places(dec!(1.2300)), 2);
        assert_eq!(decimal_places(dec!(10)), 0);
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(div(dec!(1), dec!(0)), Err(MathError::DivisionByZero));
    }
}
