//! Domain error types.
//!
//! Every rejected precondition maps to exactly one variant with a stable
//! message string, so callers can tell failures apart without string
//! matching on formatted context.

use thiserror::Error;

/// Arithmetic and quote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// Intermediate value exceeded the representable decimal range.
    #[error("decimal overflow")]
    Overflow,
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// An amount that must be strictly positive was zero or negative.
    #[error("amount must be positive")]
    NonPositiveAmount,
    /// A reserve that must be strictly positive was zero or negative.
    #[error("pool reserve is empty")]
    EmptyReserve,
    /// A swap would consume the entire output reserve.
    #[error("insufficient reserve for requested amount")]
    ReserveExhausted,
    /// Square root of a negative value.
    #[error("square root of negative value")]
    NegativeRoot,
}

/// Token pair parsing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    /// The pair string is not two symbols joined by a single separator.
    #[error("token pair must be BASE:QUOTE")]
    InvalidFormat,
    /// One of the symbols is empty, too long, or contains invalid characters.
    #[error("invalid token symbol")]
    InvalidSymbol,
    /// Base and quote symbols are the same.
    #[error("base and quote symbols must differ")]
    IdenticalSymbols,
}
