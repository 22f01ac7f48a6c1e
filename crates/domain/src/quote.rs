//! Constant-product quote functions.
//!
//! Pure functions over pool reserves. Results carry full decimal
//! precision; rounding to token precision is the caller's responsibility
//! (swap handlers round inputs up and outputs down).

use rust_decimal::Decimal;

use crate::decimal::{div, mul};
use crate::error::MathError;

/// Proportional counter-amount for a deposit: `amount * reserve_out /
/// reserve_in`.
///
/// # Errors
/// [`MathError::NonPositiveAmount`] if `amount <= 0`,
/// [`MathError::EmptyReserve`] if either reserve is `<= 0`.
pub fn counter_amount(
    amount: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
) -> Result<Decimal, MathError> {
    check_inputs(amount, reserve_in, reserve_out)?;
    div(mul(amount, reserve_out)?, reserve_in)
}

/// Output obtainable for `amount_in`: `amount_in * reserve_out /
/// (reserve_in + amount_in)`.
///
/// # Errors
/// [`MathError::ReserveExhausted`] unless the result is strictly below
/// `reserve_out`; non-positive inputs as in [`counter_amount`].
pub fn amount_out(
    amount_in: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
) -> Result<Decimal, MathError> {
    check_inputs(amount_in, reserve_in, reserve_out)?;
    let denominator = reserve_in
        .checked_add(amount_in)
        .ok_or(MathError::Overflow)?;
    let out = div(mul(amount_in, reserve_out)?, denominator)?;
    if out < reserve_out {
        Ok(out)
    } else {
        Err(MathError::ReserveExhausted)
    }
}

/// Input required to withdraw `amount_out`: `reserve_in * amount_out /
/// (reserve_out - amount_out)`.
///
/// # Errors
/// [`MathError::ReserveExhausted`] unless `amount_out < reserve_out`
/// strictly; non-positive inputs as in [`counter_amount`].
pub fn amount_in(
    amount_out: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
) -> Result<Decimal, MathError> {
    check_inputs(amount_out, reserve_in, reserve_out)?;
    if amount_out >= reserve_out {
        return Err(MathError::ReserveExhausted);
    }
    let denominator = reserve_out
        .checked_sub(amount_out)
        .ok_or(MathError::Overflow)?;
    div(mul(reserve_in, amount_out)?, denominator)
}

fn check_inputs(
    amount: Decimal,
    reserve_in: Decimal,
    reserve_out: Decimal,
) -> Result<(), MathError> {
    if amount <= Decimal::ZERO {
        return Err(MathError::NonPositiveAmount);
    }
    if reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Err(MathError::EmptyReserve);
    }
    Ok(())
}
