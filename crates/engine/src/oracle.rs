//! External price oracle and deviation guard.
//!
//! The guard compares a proposed pool price against the order-book
//! reference before a first deposit fixes an empty pool's price. A
//! missing reference is not a failure: the pool simply starts without
//! oracle protection, which can only happen on that first deposit.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use tidepool_domain::TokenPair;
use tidepool_domain::decimal::div;

use crate::error::EngineError;

/// Last-traded-price lookup per symbol.
pub trait PriceOracle {
    /// Reference price for `symbol`, if one is known.
    fn last_price(&self, symbol: &str) -> Option<Decimal>;
}

/// Map-backed oracle for tests and the demo CLI.
#[derive(Debug, Clone, Default)]
pub struct FixedPriceOracle {
    prices: BTreeMap<String, Decimal>,
}

impl FixedPriceOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reference price for a symbol.
    pub fn set(&mut self, symbol: impl Into<String>, price: Decimal) {
        self.prices.insert(symbol.into(), price);
    }
}

impl PriceOracle for FixedPriceOracle {
    fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied()
    }
}

/// Outcome of a deviation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleVerdict {
    /// Both references were available and the price passed the bound.
    Checked,
    /// A reference was missing; the guard was skipped.
    Unavailable,
}

/// Rejects `new_price` if it strays more than `max_deviation` from the
/// oracle-implied base/quote price. The peg symbol's reference is fixed
/// at 1 without a lookup.
///
/// # Errors
/// [`EngineError::PriceDeviationExceeded`] when the bound is breached.
pub fn check_deviation<O: PriceOracle>(
    oracle: &O,
    peg_symbol: &str,
    pair: &TokenPair,
    new_price: Decimal,
    max_deviation: Decimal,
) -> Result<OracleVerdict, EngineError> {
    let base_ref = reference_price(oracle, peg_symbol, pair.base());
    let quote_ref = reference_price(oracle, peg_symbol, pair.quote());
    let (Some(base_ref), Some(quote_ref)) = (base_ref, quote_ref) else {
        debug!(pair = %pair, "oracle reference unavailable, skipping deviation check");
        return Ok(OracleVerdict::Unavailable);
    };
    let oracle_price = div(base_ref, quote_ref)?;
    let deviation = div(
        new_price
            .checked_sub(oracle_price)
            .ok_or(tidepool_domain::MathError::Overflow)?
            .abs(),
        oracle_price,
    )?;
    if deviation > max_deviation {
        return Err(EngineError::PriceDeviationExceeded);
    }
    Ok(OracleVerdict::Checked)
}

fn reference_price<O: PriceOracle>(
    oracle: &O,
    peg_symbol: &str,
    symbol: &str,
) -> Option<Decimal> {
    if symbol == peg_symbol {
        return Some(Decimal::ONE);
    }
    oracle
        .last_price(symbol)
        .filter(|price| *price > Decimal::ZERO)
}
