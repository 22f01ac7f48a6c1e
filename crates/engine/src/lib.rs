//! Deterministic constant-product AMM pool engine.
//!
//! The engine owns pool and liquidity-position records and applies the
//! four actions (`create_pool`, `add_liquidity`, `remove_liquidity`,
//! `swap_tokens`) against them. Token custody and reference prices live
//! behind the [`tokens::TokenLedger`] and [`oracle::PriceOracle`] traits;
//! the host ledger invokes one action per transaction, synchronously,
//! with exclusive access to the records it touches.

pub mod actions;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod oracle;
pub mod prelude;
pub mod tokens;
pub mod validate;

pub use actions::{ActionContext, PoolEngine, TradeType};
pub use config::EngineConfig;
pub use error::EngineError;
pub use event::EngineEvent;
