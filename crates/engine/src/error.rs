//! Engine error type.
//!
//! One variant per rejected precondition, each with a stable message, so
//! a transaction submitter can distinguish every failure reason. All
//! errors abort the single action invocation; there is no retry inside
//! the engine.

use thiserror::Error;

use tidepool_domain::{MathError, PairError};

use crate::tokens::TokenError;

/// Failures surfaced by the action handlers and validators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    // Validation errors: malformed or out-of-range parameters.
    /// Token pair string is malformed.
    #[error(transparent)]
    InvalidTokenPair(#[from] PairError),
    /// A referenced token does not exist in the token ledger.
    #[error("unknown token: {0}")]
    UnknownToken(String),
    /// A pool for the pair (in either order) already exists.
    #[error("pool already exists for this pair")]
    PoolAlreadyExists,
    /// No pool exists for the pair.
    #[error("pool not found")]
    PoolNotFound,
    /// The account has no liquidity position in the pool.
    #[error("liquidity position not found")]
    PositionNotFound,
    /// A quantity parameter is zero, negative, or otherwise out of range.
    #[error("invalid quantity")]
    InvalidQuantity,
    /// A quantity carries more decimal places than the token allows.
    #[error("quantity exceeds token precision")]
    PrecisionExceeded,
    /// Shares percentage outside (0, 100] or more than 3 decimal places.
    #[error("shares percentage must be in (0, 100] with at most 3 decimal places")]
    InvalidSharesPercent,
    /// The swapped symbol is not one of the pair's legs.
    #[error("token symbol is not part of the pair")]
    SymbolNotInPair,

    // Invariant violations.
    /// The reserve delta changes the constant product at pool precision.
    #[error("constant product invariant violated")]
    ConstantProductViolated,
    /// The operation moves the pool price beyond the slippage bound.
    #[error("price slippage exceeds maximum")]
    SlippageExceeded,
    /// The proposed price deviates too far from the oracle reference.
    #[error("price deviates from oracle beyond maximum")]
    PriceDeviationExceeded,
    /// The account balance does not cover the required amount.
    #[error("insufficient balance")]
    InsufficientBalance,
    /// The pool cannot cover the requested output.
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    /// The deposit is too small to mint any shares.
    #[error("deposit too small to mint shares")]
    InsufficientShares,
    /// The trade is too small to produce any output at token precision.
    #[error("amount too small to swap")]
    AmountTooSmall,

    // External-call failures and arithmetic.
    /// The token ledger rejected a transfer.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// A transfer receipt does not match the requested transfer.
    #[error("transfer receipt does not match request")]
    TransferMismatch,
    /// Checked decimal arithmetic failed.
    #[error(transparent)]
    Math(#[from] MathError),
}
