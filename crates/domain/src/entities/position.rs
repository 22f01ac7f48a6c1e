use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pair::TokenPair;

/// An account's proportional share claim on one pool's reserves.
///
/// Created on first deposit, deleted exactly when `shares` reaches zero.
/// `0 < shares <= pool.total_shares` holds while the record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub account: String,
    pub token_pair: TokenPair,
    pub shares: Decimal,
    /// Timestamp-like age weighting in unix seconds. Pulled toward "now"
    /// proportionally when the position grows; withdrawals leave it alone.
    pub time_factor: u64,
}

impl LiquidityPosition {
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        token_pair: TokenPair,
        shares: Decimal,
        time_factor: u64,
    ) -> Self {
        Self {
            account: account.into(),
            token_pair,
            shares,
            time_factor,
        }
    }
}
