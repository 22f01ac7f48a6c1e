//! Core types and deterministic math for the tidepool AMM engine.
//!
//! Everything in this crate is pure: no I/O, no clocks, no global state.
//! All arithmetic runs on [`rust_decimal::Decimal`] with explicit rounding
//! so that every node replaying the same operations computes bit-identical
//! results.

pub mod decimal;
pub mod entities;
pub mod error;
pub mod pair;
pub mod quote;
pub mod shares;

pub use entities::{LiquidityPosition, Pool};
pub use error::{MathError, PairError};
pub use pair::TokenPair;
