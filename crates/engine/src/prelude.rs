//! Prelude module for convenient imports.
//!
//! Re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use tidepool_engine::prelude::*;
//! ```

pub use crate::actions::{ActionContext, PoolEngine, TradeType};
pub use crate::config::EngineConfig;
pub use crate::error::EngineError;
pub use crate::event::EngineEvent;
pub use crate::ledger::{PoolDelta, PoolLedger, PositionPages};
pub use crate::oracle::{FixedPriceOracle, OracleVerdict, PriceOracle};
pub use crate::tokens::{InMemoryTokenLedger, TokenInfo, TokenLedger, TransferReceipt};
