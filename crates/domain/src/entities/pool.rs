use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{div, mul, round_half_up};
use crate::error::MathError;
use crate::pair::TokenPair;

/// Reserve and share-accounting record for one tradable token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub token_pair: TokenPair,
    pub base_quantity: Decimal,
    pub quote_quantity: Decimal,
    pub base_price: Decimal,
    pub quote_price: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
    pub total_shares: Decimal,
    /// Max of the two token precisions, fixed at creation. Governs all
    /// rounding for this pool for its lifetime.
    pub precision: u32,
    pub creator: String,
}

impl Pool {
    /// Creates a fresh zero-reserve pool.
    #[must_use]
    pub fn new(token_pair: TokenPair, precision: u32, creator: impl Into<String>) -> Self {
        Self {
            token_pair,
            base_quantity: Decimal::ZERO,
            quote_quantity: Decimal::ZERO,
            base_price: Decimal::ZERO,
            quote_price: Decimal::ZERO,
            base_volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
            total_shares: Decimal::ZERO,
            precision,
            creator: creator.into(),
        }
    }

    /// Whether the pool holds no liquidity yet (fresh or fully drained).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_shares.is_zero()
    }

    /// The constant product `base_quantity * quote_quantity`.
    ///
    /// # Errors
    /// Returns [`MathError::Overflow`] if the product is not representable.
    pub fn k(&self) -> Result<Decimal, MathError> {
        mul(self.base_quantity, self.quote_quantity)
    }

    /// Recomputes the derived display prices from current reserves,
    /// rounded half-up at pool precision. If either reserve is zero the
    /// last known prices are kept for continuity.
    ///
    /// # Errors
    /// Returns [`MathError::Overflow`] if a quotient is not representable.
    pub fn update_prices(&mut self) -> Result<(), MathError> {
        if self.base_quantity > Decimal::ZERO && self.quote_quantity > Decimal::ZERO {
            self.base_price = round_half_up(
                div(self.quote_quantity, self.base_quantity)?,
                self.precision,
            );
            self.quote_price = round_half_up(
                div(self.base_quantity, self.quote_quantity)?,
                self.precision,
            );
        }
        Ok(())
    }
}
