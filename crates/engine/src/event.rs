//! Events emitted by successful actions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One event per committed action, returned to the caller and logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum EngineEvent {
    /// A pool was created for the pair.
    PoolCreated { token_pair: String },
    /// Liquidity was deposited into a pool.
    LiquidityAdded {
        account: String,
        base_symbol: String,
        quote_symbol: String,
        base_quantity: Decimal,
        quote_quantity: Decimal,
    },
    /// Liquidity was withdrawn from a pool.
    LiquidityRemoved {
        account: String,
        base_symbol: String,
        quote_symbol: String,
        base_quantity: Decimal,
        quote_quantity: Decimal,
    },
    /// A swap executed against a pool.
    TokensSwapped {
        account: String,
        symbol_in: String,
        symbol_out: String,
        amount_in: Decimal,
        amount_out: Decimal,
    },
}
