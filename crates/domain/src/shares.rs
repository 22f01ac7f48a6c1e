//! Liquidity share accounting.
//!
//! Mint and withdrawal math for pool ownership shares. Shares are kept at
//! pool precision; mints round down so rounding dust always stays with
//! the pool, never the depositor.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::decimal::{div, mul, round_down, sqrt};
use crate::error::MathError;

/// Shares minted for the first deposit into an empty pool:
/// `sqrt(base * quote)`, rounded down at pool precision.
///
/// # Errors
/// Propagates arithmetic failures from the checked decimal ops.
pub fn initial_shares(
    base: Decimal,
    quote: Decimal,
    precision: u32,
) -> Result<Decimal, MathError> {
    Ok(round_down(sqrt(mul(base, quote)?)?, precision))
}

/// Shares minted for a deposit into a live pool: the minimum of the two
/// proportional claims, rounded down at pool precision.
///
/// Taking the minimum stops a depositor from minting against the larger
/// side of an unbalanced deposit.
///
/// # Errors
/// Propagates arithmetic failures from the checked decimal ops.
pub fn proportional_shares(
    base_added: Decimal,
    quote_added: Decimal,
    base_reserve: Decimal,
    quote_reserve: Decimal,
    total_shares: Decimal,
    precision: u32,
) -> Result<Decimal, MathError> {
    let by_base = div(mul(base_added, total_shares)?, base_reserve)?;
    let by_quote = div(mul(quote_added, total_shares)?, quote_reserve)?;
    Ok(round_down(by_base.min(by_quote), precision))
}

/// Token amounts owed for withdrawing `shares_delta` shares, at full
/// precision. The handler floors each leg to its token precision.
///
/// # Errors
/// Propagates arithmetic failures from the checked decimal ops.
pub fn withdrawal_amounts(
    shares_delta: Decimal,
    base_reserve: Decimal,
    quote_reserve: Decimal,
    total_shares: Decimal,
) -> Result<(Decimal, Decimal), MathError> {
    let base_out = div(mul(shares_delta, base_reserve)?, total_shares)?;
    let quote_out = div(mul(shares_delta, quote_reserve)?, total_shares)?;
    Ok((base_out, quote_out))
}

/// Blends a position's time factor toward `now` when shares are added.
///
/// The factor moves by the fraction of the position the new shares
/// represent: `tf + (now - tf) * added / (existing + added)`, floored to
/// whole seconds and clamped so it never passes `now`. Withdrawals do not
/// call this.
///
/// # Errors
/// Propagates arithmetic failures from the checked decimal ops.
pub fn blend_time_factor(
    existing_tf: u64,
    existing_shares: Decimal,
    added_shares: Decimal,
    now: u64,
) -> Result<u64, MathError> {
    if now <= existing_tf || added_shares <= Decimal::ZERO {
        return Ok(existing_tf);
    }
    let total = existing_shares
        .checked_add(added_shares)
        .ok_or(MathError::Overflow)?;
    if total <= Decimal::ZERO {
        return Ok(now);
    }
    let span = Decimal::from(now - existing_tf);
    let offset = round_down(div(mul(span, added_shares)?, total)?, 0)
        .to_u64()
        .ok_or(MathError::Overflow)?;
    Ok((existing_tf + offset).min(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_initial_shares_sqrt() {
        let shares = initial_shares(dec!(1000), dec!(2000), 8).unwrap();
        assert_eq!(shares, dec!(1414.21356237));
    }

    #[test]
    fn test_proportional_shares_takes_minimum() {
        // Pool 1000/2000 with 1414.21356237 shares; a 10/30 deposit is
        // quote-heavy, so the base side bounds the mint.
        let shares = proportional_shares(
            dec!(10),
            dec!(30),
            dec!(1000),
            dec!(2000),
            dec!(1414.21356237),
            8,
        )
        .unwrap();
        assert_eq!(shares, dec!(14.14213562));
    }

    #[test]
    fn test_withdrawal_amounts_proportional() {
        let (base_out, quote_out) = withdrawal_amounts(
            dec!(707.10678118),
            dec!(1000),
            dec!(2000),
            dec!(1414.21356237),
        )
        .unwrap();
        // Just under half of each reserve: the share delta was floored.
        assert_eq!(round_down(base_out, 8), dec!(499.99999999));
        assert_eq!(round_down(quote_out, 8), dec!(999.99999999));
    }

    #[test]
    fn test_blend_time_factor_moves_proportionally() {
        // Doubling the position halves the remaining distance to now.
        let tf = blend_time_factor(1_000, dec!(100), dec!(100), 2_000).unwrap();
        assert_eq!(tf, 1_500);
    }

    #[test]
    fn test_blend_time_factor_never_passes_now() {
        let tf = blend_time_factor(1_000, dec!(0.0001), dec!(1000000), 2_000).unwrap();
        assert!(tf <= 2_000);
        // A withdrawal-style call with nothing added leaves it alone.
        assert_eq!(blend_time_factor(1_000, dec!(50), dec!(0), 2_000).unwrap(), 1_000);
    }
}
