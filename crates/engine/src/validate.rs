//! Pair and swap validation.
//!
//! The swap validator re-derives the constant product and price impact
//! from a proposed reserve delta and rejects the operation outright if
//! either bound breaks. Nothing here mutates state.

use rust_decimal::Decimal;

use tidepool_domain::decimal::{add, div, mul, round_sig, sub};
use tidepool_domain::{Pool, TokenPair};

use crate::error::EngineError;
use crate::ledger::PoolLedger;
use crate::tokens::TokenLedger;

/// Checks that a pair can back a new pool: both tokens exist and no pool
/// is registered under the pair or its reverse. Returns the new pool's
/// precision (max of the two token precisions).
///
/// # Errors
/// [`EngineError::UnknownToken`] or [`EngineError::PoolAlreadyExists`].
pub fn validate_new_pair<T: TokenLedger>(
    ledger: &PoolLedger,
    tokens: &T,
    pair: &TokenPair,
) -> Result<u32, EngineError> {
    let base = tokens
        .token(pair.base())
        .ok_or_else(|| EngineError::UnknownToken(pair.base().to_string()))?;
    let quote = tokens
        .token(pair.quote())
        .ok_or_else(|| EngineError::UnknownToken(pair.quote().to_string()))?;
    if ledger.contains_pair_or_reverse(pair) {
        return Err(EngineError::PoolAlreadyExists);
    }
    Ok(base.precision.max(quote.precision))
}

/// Validates a proposed swap delta against the pool.
///
/// The constant product before and after the delta must agree exactly at
/// the pool's precision (significant digits), and the relative price
/// move must stay within `max_slippage`. Either failure aborts the swap
/// with no partial state change.
///
/// # Errors
/// [`EngineError::ConstantProductViolated`],
/// [`EngineError::SlippageExceeded`], or
/// [`EngineError::InsufficientLiquidity`] if a reserve would be drained
/// to or below zero.
pub fn validate_swap(
    pool: &Pool,
    delta_base: Decimal,
    delta_quote: Decimal,
    max_slippage: Decimal,
) -> Result<(), EngineError> {
    let new_base = add(pool.base_quantity, delta_base)?;
    let new_quote = add(pool.quote_quantity, delta_quote)?;
    if new_base <= Decimal::ZERO || new_quote <= Decimal::ZERO {
        return Err(EngineError::InsufficientLiquidity);
    }

    let k_before = round_sig(pool.k()?, pool.precision)?;
    let k_after = round_sig(mul(new_base, new_quote)?, pool.precision)?;
    if k_after != k_before {
        return Err(EngineError::ConstantProductViolated);
    }

    let price_before = div(pool.quote_quantity, pool.base_quantity)?;
    let price_after = div(new_quote, new_base)?;
    let move_pct = div(sub(price_after, price_before)?.abs(), price_before)?;
    if move_pct > max_slippage {
        return Err(EngineError::SlippageExceeded);
    }
    Ok(())
}
