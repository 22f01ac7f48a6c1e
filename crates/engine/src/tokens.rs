//! External token-ledger interface.
//!
//! The engine never holds balances itself; it asks the host's fungible
//! token ledger for symbol metadata, balances, and custodial transfers.
//! [`InMemoryTokenLedger`] is the reference implementation used by tests
//! and the demo CLI.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tidepool_domain::decimal::decimal_places;

/// Symbol metadata consumed from the token ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: String,
    /// Native decimal places of the token.
    pub precision: u32,
}

impl TokenInfo {
    #[must_use]
    pub fn new(symbol: impl Into<String>, precision: u32) -> Self {
        Self {
            symbol: symbol.into(),
            precision,
        }
    }
}

/// Verifiable record of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: String,
    pub to: String,
    pub symbol: String,
    pub quantity: Decimal,
}

/// Token-ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The symbol is not registered.
    #[error("token does not exist")]
    UnknownToken,
    /// The sender balance does not cover the transfer.
    #[error("insufficient token balance")]
    InsufficientBalance,
    /// Transfer quantity is zero or negative.
    #[error("transfer quantity must be positive")]
    InvalidQuantity,
    /// Transfer quantity has more decimal places than the token allows.
    #[error("transfer quantity exceeds token precision")]
    PrecisionExceeded,
}

/// The balance and transfer primitives the engine consumes.
pub trait TokenLedger {
    /// Looks up symbol metadata; `None` if the token does not exist.
    fn token(&self, symbol: &str) -> Option<TokenInfo>;

    /// Current balance of `account` in `symbol` (zero if absent).
    fn balance(&self, account: &str, symbol: &str) -> Decimal;

    /// Moves `quantity` of `symbol` between accounts, returning the
    /// verifiable receipt.
    ///
    /// # Errors
    /// Returns a [`TokenError`] and leaves balances untouched on any
    /// invalid transfer.
    fn transfer(
        &mut self,
        from: &str,
        to: &str,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<TransferReceipt, TokenError>;
}

/// Map-backed token ledger with deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenLedger {
    tokens: BTreeMap<String, TokenInfo>,
    balances: BTreeMap<(String, String), Decimal>,
}

impl InMemoryTokenLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token symbol.
    pub fn register(&mut self, info: TokenInfo) {
        self.tokens.insert(info.symbol.clone(), info);
    }

    /// Credits `quantity` of `symbol` to `account` out of thin air.
    /// Issuance authority is the host's concern, not this engine's.
    ///
    /// # Errors
    /// Returns a [`TokenError`] on unknown symbol or invalid quantity.
    pub fn issue(
        &mut self,
        account: &str,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<(), TokenError> {
        self.validate_quantity(symbol, quantity)?;
        let key = (account.to_string(), symbol.to_string());
        let balance = self.balances.entry(key).or_insert(Decimal::ZERO);
        *balance += quantity;
        Ok(())
    }

    fn validate_quantity(&self, symbol: &str, quantity: Decimal) -> Result<(), TokenError> {
        let info = self.tokens.get(symbol).ok_or(TokenError::UnknownToken)?;
        if quantity <= Decimal::ZERO {
            return Err(TokenError::InvalidQuantity);
        }
        if decimal_places(quantity) > info.precision {
            return Err(TokenError::PrecisionExceeded);
        }
        Ok(())
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn token(&self, symbol: &str) -> Option<TokenInfo> {
        self.tokens.get(symbol).cloned()
    }

    fn balance(&self, account: &str, symbol: &str) -> Decimal {
        self.balances
            .get(&(account.to_string(), symbol.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn transfer(
        &mut self,
        from: &str,
        to: &str,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<TransferReceipt, TokenError> {
        self.validate_quantity(symbol, quantity)?;
        let from_key = (from.to_string(), symbol.to_string());
        let from_balance = self.balances.get(&from_key).copied().unwrap_or(Decimal::ZERO);
        if from_balance < quantity {
            return Err(TokenError::InsufficientBalance);
        }
        self.balances.insert(from_key, from_balance - quantity);
        let to_key = (to.to_string(), symbol.to_string());
        let to_balance = self.balances.entry(to_key).or_insert(Decimal::ZERO);
        *to_balance += quantity;
        Ok(TransferReceipt {
            from: from.to_string(),
            to: to.to_string(),
            symbol: symbol.to_string(),
            quantity,
        })
    }
}
