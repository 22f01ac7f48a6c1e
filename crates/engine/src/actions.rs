//! Action handlers.
//!
//! Each handler loads the pool record, computes and validates the
//! proposed change, triggers the external token transfers, and only then
//! commits through the pool ledger. Every validation failure aborts with
//! no state change; if the second leg of a paired transfer fails after
//! the first succeeded, the first is explicitly refunded rather than
//! left stranded in custody.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use tidepool_domain::decimal::{add, decimal_places, div, mul, round_down, round_half_up, round_up, sub};
use tidepool_domain::{LiquidityPosition, Pool, TokenPair, quote, shares};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::event::EngineEvent;
use crate::ledger::{PoolDelta, PoolLedger};
use crate::oracle::{PriceOracle, check_deviation};
use crate::tokens::{TokenInfo, TokenLedger};
use crate::validate::{validate_new_pair, validate_swap};

/// Host-supplied context for one action invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    /// Account submitting the action.
    pub account: String,
    /// Transaction timestamp in unix seconds. Only used for position
    /// time-factor blending; the engine never reads a clock itself.
    pub timestamp: u64,
}

impl ActionContext {
    #[must_use]
    pub fn new(account: impl Into<String>, timestamp: u64) -> Self {
        Self {
            account: account.into(),
            timestamp,
        }
    }
}

/// Which side of a swap the caller fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    /// `token_amount` is the quantity being sold.
    ExactInput,
    /// `token_amount` is the quantity being bought.
    ExactOutput,
}

/// The pool engine: owns the pool ledger and drives all state
/// transitions against the external token ledger and price oracle.
#[derive(Debug)]
pub struct PoolEngine<T: TokenLedger, O: PriceOracle> {
    config: EngineConfig,
    tokens: T,
    oracle: O,
    ledger: PoolLedger,
}

impl<T: TokenLedger, O: PriceOracle> PoolEngine<T, O> {
    #[must_use]
    pub fn new(config: EngineConfig, tokens: T, oracle: O) -> Self {
        Self {
            config,
            tokens,
            oracle,
            ledger: PoolLedger::new(),
        }
    }

    /// Read access to the pool ledger.
    #[must_use]
    pub fn ledger(&self) -> &PoolLedger {
        &self.ledger
    }

    /// Read access to the token ledger.
    pub fn tokens(&self) -> &T {
        &self.tokens
    }

    /// Mutable access to the token ledger, for seeding balances.
    pub fn tokens_mut(&mut self) -> &mut T {
        &mut self.tokens
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pages through a pool's positions at the configured page size.
    /// External consumers (reward distribution, reporting) enumerate
    /// positions through this instead of unbounded scans.
    #[must_use]
    pub fn positions(&self, pair: &TokenPair) -> crate::ledger::PositionPages<'_> {
        self.ledger
            .positions_for(pair, self.config.position_page_size)
    }

    /// Creates an empty pool for `token_pair`, burning the creation fee
    /// unless it is zero or the creator is fee-exempt.
    ///
    /// # Errors
    /// Pair validation, fee balance, or transfer failures; nothing is
    /// persisted on any error.
    pub fn create_pool(
        &mut self,
        ctx: &ActionContext,
        token_pair: &str,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let pair: TokenPair = token_pair.parse()?;
        let precision = validate_new_pair(&self.ledger, &self.tokens, &pair)?;

        let fee = self.config.pool_creation_fee;
        let exempt = fee <= Decimal::ZERO
            || self.config.fee_exempt_account.as_deref() == Some(ctx.account.as_str());
        if !exempt {
            if self.tokens.balance(&ctx.account, &self.config.fee_symbol) < fee {
                return Err(EngineError::InsufficientBalance);
            }
            let burn_account = self.config.burn_account.clone();
            let fee_symbol = self.config.fee_symbol.clone();
            self.checked_transfer(&ctx.account, &burn_account, &fee_symbol, fee)?;
        }

        self.ledger
            .insert_pool(Pool::new(pair.clone(), precision, &ctx.account));
        info!(pair = %pair, creator = %ctx.account, "pool created");
        Ok(vec![EngineEvent::PoolCreated {
            token_pair: pair.to_string(),
        }])
    }

    /// Deposits both legs of the pair and mints proportional shares.
    ///
    /// For an empty pool the supplied ratio fixes the initial price and
    /// is checked against the oracle (unless `max_deviation` is zero).
    /// For a live pool the smaller-valued side caps the deposit: the
    /// counter-amount is recomputed from reserves and the oversupplied
    /// side is trimmed, rejecting if the trim exceeds `max_slippage`.
    ///
    /// # Errors
    /// Validation, guard, balance, or transfer failures.
    pub fn add_liquidity(
        &mut self,
        ctx: &ActionContext,
        token_pair: &str,
        base_quantity: Decimal,
        quote_quantity: Decimal,
        max_slippage: Option<Decimal>,
        max_deviation: Option<Decimal>,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let pair: TokenPair = token_pair.parse()?;
        let pool = self
            .ledger
            .pool(&pair)
            .ok_or(EngineError::PoolNotFound)?
            .clone();
        let base_info = self.token_info(pair.base())?;
        let quote_info = self.token_info(pair.quote())?;

        if base_quantity <= Decimal::ZERO || quote_quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity);
        }
        if decimal_places(base_quantity) > base_info.precision
            || decimal_places(quote_quantity) > quote_info.precision
        {
            return Err(EngineError::PrecisionExceeded);
        }
        let max_slippage = resolve_bound(max_slippage, self.config.default_max_slippage)?;
        let max_deviation = resolve_bound(max_deviation, self.config.default_max_deviation)?;

        let (base_adjusted, quote_adjusted) = if pool.is_empty() {
            // First deposit establishes the price; guard it against the
            // oracle unless explicitly disabled with a zero deviation.
            if max_deviation > Decimal::ZERO {
                let implied_price = div(quote_quantity, base_quantity)?;
                check_deviation(
                    &self.oracle,
                    &self.config.peg_symbol,
                    &pair,
                    implied_price,
                    max_deviation,
                )?;
            }
            (base_quantity, quote_quantity)
        } else {
            let quote_optimal = round_half_up(
                quote::counter_amount(base_quantity, pool.base_quantity, pool.quote_quantity)?,
                quote_info.precision,
            );
            if quote_optimal <= quote_quantity {
                check_deposit_deviation(quote_quantity, quote_optimal, max_slippage)?;
                (base_quantity, quote_optimal)
            } else {
                let base_optimal = round_half_up(
                    quote::counter_amount(quote_quantity, pool.quote_quantity, pool.base_quantity)?,
                    base_info.precision,
                );
                check_deposit_deviation(base_quantity, base_optimal, max_slippage)?;
                (base_optimal, quote_quantity)
            }
        };
        if base_adjusted <= Decimal::ZERO || quote_adjusted <= Decimal::ZERO {
            return Err(EngineError::AmountTooSmall);
        }

        let new_shares = if pool.is_empty() {
            shares::initial_shares(base_adjusted, quote_adjusted, pool.precision)?
        } else {
            shares::proportional_shares(
                base_adjusted,
                quote_adjusted,
                pool.base_quantity,
                pool.quote_quantity,
                pool.total_shares,
                pool.precision,
            )?
        };
        if new_shares <= Decimal::ZERO {
            return Err(EngineError::InsufficientShares);
        }

        if self.tokens.balance(&ctx.account, pair.base()) < base_adjusted
            || self.tokens.balance(&ctx.account, pair.quote()) < quote_adjusted
        {
            return Err(EngineError::InsufficientBalance);
        }

        // All fallible position math happens before any transfer.
        let position = match self.ledger.position(&pair, &ctx.account).cloned() {
            Some(mut position) => {
                position.time_factor = shares::blend_time_factor(
                    position.time_factor,
                    position.shares,
                    new_shares,
                    ctx.timestamp,
                )?;
                position.shares = add(position.shares, new_shares)?;
                position
            }
            None => LiquidityPosition::new(&ctx.account, pair.clone(), new_shares, ctx.timestamp),
        };

        let custody = self.config.custody_account.clone();
        self.transfer_pair_with_refund(
            &ctx.account,
            &custody,
            (&base_info.symbol, base_adjusted),
            (&quote_info.symbol, quote_adjusted),
        )?;

        self.ledger.upsert_position(position);
        self.ledger.update_pool_stats(
            &pair,
            &PoolDelta {
                base: base_adjusted,
                quote: quote_adjusted,
                shares: new_shares,
                ..PoolDelta::default()
            },
        )?;
        info!(
            pair = %pair,
            account = %ctx.account,
            base = %base_adjusted,
            quote = %quote_adjusted,
            shares = %new_shares,
            "liquidity added"
        );
        Ok(vec![EngineEvent::LiquidityAdded {
            account: ctx.account.clone(),
            base_symbol: base_info.symbol,
            quote_symbol: quote_info.symbol,
            base_quantity: base_adjusted,
            quote_quantity: quote_adjusted,
        }])
    }

    /// Withdraws `shares_out_pct` percent of the caller's position,
    /// returning both legs proportionally.
    ///
    /// # Errors
    /// Validation, liquidity, or transfer failures.
    pub fn remove_liquidity(
        &mut self,
        ctx: &ActionContext,
        token_pair: &str,
        shares_out_pct: Decimal,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let pair: TokenPair = token_pair.parse()?;
        let pool = self
            .ledger
            .pool(&pair)
            .ok_or(EngineError::PoolNotFound)?
            .clone();
        let base_info = self.token_info(pair.base())?;
        let quote_info = self.token_info(pair.quote())?;

        if shares_out_pct <= Decimal::ZERO
            || shares_out_pct > Decimal::ONE_HUNDRED
            || decimal_places(shares_out_pct) > 3
        {
            return Err(EngineError::InvalidSharesPercent);
        }
        let position = self
            .ledger
            .position(&pair, &ctx.account)
            .cloned()
            .ok_or(EngineError::PositionNotFound)?;

        // A full withdrawal takes the exact stored balance so the
        // position always lands on exactly zero.
        let shares_delta = if shares_out_pct == Decimal::ONE_HUNDRED {
            position.shares
        } else {
            round_down(
                div(mul(position.shares, shares_out_pct)?, Decimal::ONE_HUNDRED)?,
                pool.precision,
            )
        };
        if shares_delta <= Decimal::ZERO {
            return Err(EngineError::InsufficientShares);
        }

        let (base_raw, quote_raw) = shares::withdrawal_amounts(
            shares_delta,
            pool.base_quantity,
            pool.quote_quantity,
            pool.total_shares,
        )?;
        let base_out = round_down(base_raw, base_info.precision);
        let quote_out = round_down(quote_raw, quote_info.precision);
        if base_out <= Decimal::ZERO || quote_out <= Decimal::ZERO {
            return Err(EngineError::AmountTooSmall);
        }
        if base_out > pool.base_quantity || quote_out > pool.quote_quantity {
            return Err(EngineError::InsufficientLiquidity);
        }
        let remaining = sub(position.shares, shares_delta)?;

        let custody = self.config.custody_account.clone();
        self.transfer_pair_with_refund(
            &custody,
            &ctx.account,
            (&base_info.symbol, base_out),
            (&quote_info.symbol, quote_out),
        )?;

        if remaining.is_zero() {
            self.ledger.remove_position(&pair, &ctx.account);
        } else {
            let mut updated = position;
            updated.shares = remaining;
            self.ledger.upsert_position(updated);
        }
        self.ledger.update_pool_stats(
            &pair,
            &PoolDelta {
                base: -base_out,
                quote: -quote_out,
                shares: -shares_delta,
                ..PoolDelta::default()
            },
        )?;
        info!(
            pair = %pair,
            account = %ctx.account,
            base = %base_out,
            quote = %quote_out,
            shares = %shares_delta,
            "liquidity removed"
        );
        Ok(vec![EngineEvent::LiquidityRemoved {
            account: ctx.account.clone(),
            base_symbol: base_info.symbol,
            quote_symbol: quote_info.symbol,
            base_quantity: base_out,
            quote_quantity: quote_out,
        }])
    }

    /// Swaps one leg of the pair for the other at the constant-product
    /// rate. The computed counter-amount is rounded in the pool's favor:
    /// inputs up, outputs down, at each token's native precision.
    ///
    /// # Errors
    /// Validation, invariant, balance, or transfer failures.
    pub fn swap_tokens(
        &mut self,
        ctx: &ActionContext,
        token_pair: &str,
        token_symbol: &str,
        token_amount: Decimal,
        trade_type: TradeType,
        max_slippage: Decimal,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let pair: TokenPair = token_pair.parse()?;
        let pool = self
            .ledger
            .pool(&pair)
            .ok_or(EngineError::PoolNotFound)?
            .clone();
        if !pair.contains(token_symbol) {
            return Err(EngineError::SymbolNotInPair);
        }
        if token_amount <= Decimal::ZERO || max_slippage < Decimal::ZERO {
            return Err(EngineError::InvalidQuantity);
        }
        let base_info = self.token_info(pair.base())?;
        let quote_info = self.token_info(pair.quote())?;

        // For ExactInput the named symbol is sold; for ExactOutput it is
        // bought, so the opposite leg funds the trade.
        let base_is_input = match trade_type {
            TradeType::ExactInput => token_symbol == pair.base(),
            TradeType::ExactOutput => token_symbol == pair.quote(),
        };
        let (reserve_in, reserve_out, in_info, out_info) = if base_is_input {
            (pool.base_quantity, pool.quote_quantity, &base_info, &quote_info)
        } else {
            (pool.quote_quantity, pool.base_quantity, &quote_info, &base_info)
        };

        let (amount_in, amount_out) = match trade_type {
            TradeType::ExactInput => {
                if decimal_places(token_amount) > in_info.precision {
                    return Err(EngineError::PrecisionExceeded);
                }
                let out = round_down(
                    quote::amount_out(token_amount, reserve_in, reserve_out)?,
                    out_info.precision,
                );
                if out <= Decimal::ZERO {
                    return Err(EngineError::AmountTooSmall);
                }
                (token_amount, out)
            }
            TradeType::ExactOutput => {
                if decimal_places(token_amount) > out_info.precision {
                    return Err(EngineError::PrecisionExceeded);
                }
                let input = round_up(
                    quote::amount_in(token_amount, reserve_in, reserve_out)?,
                    in_info.precision,
                );
                (input, token_amount)
            }
        };

        let (delta_base, delta_quote) = if base_is_input {
            (amount_in, -amount_out)
        } else {
            (-amount_out, amount_in)
        };
        validate_swap(&pool, delta_base, delta_quote, max_slippage)?;

        if self.tokens.balance(&ctx.account, &in_info.symbol) < amount_in {
            return Err(EngineError::InsufficientBalance);
        }

        let custody = self.config.custody_account.clone();
        self.checked_transfer(&ctx.account, &custody, &in_info.symbol, amount_in)?;
        if let Err(err) = self.checked_transfer(&custody, &ctx.account, &out_info.symbol, amount_out)
        {
            // Payout failed with the input already pulled in: hand the
            // input back instead of leaving it stranded in custody.
            if let Err(refund_err) =
                self.checked_transfer(&custody, &ctx.account, &in_info.symbol, amount_in)
            {
                error!(error = %refund_err, "refund after failed payout also failed");
            }
            return Err(err);
        }

        self.ledger.update_pool_stats(
            &pair,
            &PoolDelta {
                base: delta_base,
                quote: delta_quote,
                shares: Decimal::ZERO,
                base_volume: delta_base.abs(),
                quote_volume: delta_quote.abs(),
            },
        )?;
        info!(
            pair = %pair,
            account = %ctx.account,
            symbol_in = %in_info.symbol,
            symbol_out = %out_info.symbol,
            amount_in = %amount_in,
            amount_out = %amount_out,
            "tokens swapped"
        );
        Ok(vec![EngineEvent::TokensSwapped {
            account: ctx.account.clone(),
            symbol_in: in_info.symbol.clone(),
            symbol_out: out_info.symbol.clone(),
            amount_in,
            amount_out,
        }])
    }

    fn token_info(&self, symbol: &str) -> Result<TokenInfo, EngineError> {
        self.tokens
            .token(symbol)
            .ok_or_else(|| EngineError::UnknownToken(symbol.to_string()))
    }

    /// Transfers and verifies the receipt against the request.
    fn checked_transfer(
        &mut self,
        from: &str,
        to: &str,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<(), EngineError> {
        let receipt = self.tokens.transfer(from, to, symbol, quantity)?;
        if receipt.from != from
            || receipt.to != to
            || receipt.symbol != symbol
            || receipt.quantity != quantity
        {
            return Err(EngineError::TransferMismatch);
        }
        Ok(())
    }

    /// Transfers two legs in order; if the second fails the first is
    /// refunded before the error propagates.
    fn transfer_pair_with_refund(
        &mut self,
        from: &str,
        to: &str,
        first: (&str, Decimal),
        second: (&str, Decimal),
    ) -> Result<(), EngineError> {
        self.checked_transfer(from, to, first.0, first.1)?;
        if let Err(err) = self.checked_transfer(from, to, second.0, second.1) {
            if let Err(refund_err) = self.checked_transfer(to, from, first.0, first.1) {
                error!(error = %refund_err, "refund of first leg failed after partial transfer");
            }
            return Err(err);
        }
        Ok(())
    }
}

/// Validates an optional caller-supplied bound, falling back to the
/// configured default.
fn resolve_bound(value: Option<Decimal>, default: Decimal) -> Result<Decimal, EngineError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(EngineError::InvalidQuantity),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}

/// Relative shortfall between a supplied deposit leg and its computed
/// optimal counter-amount.
fn check_deposit_deviation(
    supplied: Decimal,
    adjusted: Decimal,
    max_slippage: Decimal,
) -> Result<(), EngineError> {
    let deviation = div(sub(supplied, adjusted)?.abs(), supplied)?;
    if deviation > max_slippage {
        return Err(EngineError::SlippageExceeded);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FixedPriceOracle;
    use crate::tokens::InMemoryTokenLedger;
    use rust_decimal_macros::dec;
    use tidepool_domain::decimal::round_sig;

    const TS: u64 = 1_700_000_000;

    fn engine() -> PoolEngine<InMemoryTokenLedger, FixedPriceOracle> {
        engine_with_config(EngineConfig::default())
    }

    fn engine_with_config(
        config: EngineConfig,
    ) -> PoolEngine<InMemoryTokenLedger, FixedPriceOracle> {
        let mut tokens = InMemoryTokenLedger::new();
        tokens.register(TokenInfo::new("TKN", 3));
        tokens.register(TokenInfo::new("TOKENA", 8));
        tokens.register(TokenInfo::new("TOKENB", 8));
        tokens.issue("alice", "TKN", dec!(5000)).unwrap();
        tokens.issue("alice", "TOKENA", dec!(10000)).unwrap();
        tokens.issue("alice", "TOKENB", dec!(10000)).unwrap();
        tokens.issue("bob", "TOKENA", dec!(1000)).unwrap();
        tokens.issue("bob", "TOKENB", dec!(1000)).unwrap();
        let mut oracle = FixedPriceOracle::new();
        oracle.set("TOKENA", dec!(2));
        oracle.set("TOKENB", dec!(1));
        PoolEngine::new(config, tokens, oracle)
    }

    fn ctx(account: &str) -> ActionContext {
        ActionContext::new(account, TS)
    }

    fn pair() -> TokenPair {
        "TOKENA:TOKENB".parse().unwrap()
    }

    /// Pool with 1000 TOKENA / 2000 TOKENB from alice.
    fn seeded_engine() -> PoolEngine<InMemoryTokenLedger, FixedPriceOracle> {
        let mut engine = engine();
        engine.create_pool(&ctx("alice"), "TOKENA:TOKENB").unwrap();
        engine
            .add_liquidity(
                &ctx("alice"),
                "TOKENA:TOKENB",
                dec!(1000),
                dec!(2000),
                None,
                None,
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_create_pool_burns_fee() {
        let mut engine = engine();
        let events = engine.create_pool(&ctx("alice"), "TOKENA:TOKENB").unwrap();
        assert_eq!(
            events,
            vec![EngineEvent::PoolCreated {
                token_pair: "TOKENA:TOKENB".to_string()
            }]
        );
        // Default fee of 1000 TKN burned to the null account.
        assert_eq!(engine.tokens().balance("alice", "TKN"), dec!(4000));
        assert_eq!(engine.tokens().balance("null", "TKN"), dec!(1000));
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.precision, 8);
        assert_eq!(pool.creator, "alice");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_create_pool_rejects_duplicate_and_reverse() {
        let mut engine = engine();
        engine.create_pool(&ctx("alice"), "TOKENA:TOKENB").unwrap();
        assert_eq!(
            engine.create_pool(&ctx("alice"), "TOKENA:TOKENB"),
            Err(EngineError::PoolAlreadyExists)
        );
        assert_eq!(
            engine.create_pool(&ctx("alice"), "TOKENB:TOKENA"),
            Err(EngineError::PoolAlreadyExists)
        );
    }

    #[test]
    fn test_create_pool_rejects_unknown_token() {
        let mut engine = engine();
        assert_eq!(
            engine.create_pool(&ctx("alice"), "TOKENA:NOPE"),
            Err(EngineError::UnknownToken("NOPE".to_string()))
        );
    }

    #[test]
    fn test_create_pool_requires_fee_balance() {
        let mut engine = engine();
        // bob holds no TKN.
        assert_eq!(
            engine.create_pool(&ctx("bob"), "TOKENA:TOKENB"),
            Err(EngineError::InsufficientBalance)
        );
        assert!(engine.ledger().pool(&pair()).is_none());
    }

    #[test]
    fn test_create_pool_fee_waivers() {
        let mut config = EngineConfig::default();
        config.fee_exempt_account = Some("bob".to_string());
        let mut engine = engine_with_config(config);
        engine.create_pool(&ctx("bob"), "TOKENA:TOKENB").unwrap();

        let mut config = EngineConfig::default();
        config.pool_creation_fee = Decimal::ZERO;
        let mut engine = engine_with_config(config);
        engine.create_pool(&ctx("bob"), "TOKENA:TOKENB").unwrap();
        assert_eq!(engine.tokens().balance("null", "TKN"), Decimal::ZERO);
    }

    #[test]
    fn test_first_deposit_mints_sqrt_shares() {
        let engine = seeded_engine();
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.total_shares, dec!(1414.21356237));
        assert_eq!(pool.base_quantity, dec!(1000));
        assert_eq!(pool.quote_quantity, dec!(2000));
        assert_eq!(pool.base_price, dec!(2));
        assert_eq!(pool.quote_price, dec!(0.5));

        let position = engine.ledger().position(&pair(), "alice").unwrap();
        assert_eq!(position.shares, dec!(1414.21356237));
        assert_eq!(position.time_factor, TS);

        // Reserves sit in custody.
        assert_eq!(engine.tokens().balance("tidepool", "TOKENA"), dec!(1000));
        assert_eq!(engine.tokens().balance("tidepool", "TOKENB"), dec!(2000));
        assert_eq!(engine.tokens().balance("alice", "TOKENA"), dec!(9000));
    }

    #[test]
    fn test_first_deposit_checked_against_oracle() {
        let mut engine = engine();
        engine.create_pool(&ctx("alice"), "TOKENA:TOKENB").unwrap();
        // Implied price 1 vs oracle 2/1 = 2.
        assert_eq!(
            engine.add_liquidity(
                &ctx("alice"),
                "TOKENA:TOKENB",
                dec!(1000),
                dec!(1000),
                None,
                None,
            ),
            Err(EngineError::PriceDeviationExceeded)
        );
        // Zero deviation disables the guard explicitly.
        engine
            .add_liquidity(
                &ctx("alice"),
                "TOKENA:TOKENB",
                dec!(1000),
                dec!(1000),
                None,
                Some(Decimal::ZERO),
            )
            .unwrap();
    }

    #[test]
    fn test_first_deposit_without_oracle_reference() {
        let mut tokens = InMemoryTokenLedger::new();
        tokens.register(TokenInfo::new("TOKENA", 8));
        tokens.register(TokenInfo::new("TOKENB", 8));
        tokens.issue("alice", "TOKENA", dec!(1000)).unwrap();
        tokens.issue("alice", "TOKENB", dec!(1000)).unwrap();
        let mut config = EngineConfig::default();
        config.pool_creation_fee = Decimal::ZERO;
        let mut engine = PoolEngine::new(config, tokens, FixedPriceOracle::new());
        engine.create_pool(&ctx("alice"), "TOKENA:TOKENB").unwrap();
        // No reference prices at all: the guard is skipped, not an error.
        engine
            .add_liquidity(
                &ctx("alice"),
                "TOKENA:TOKENB",
                dec!(100),
                dec!(700),
                None,
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_second_deposit_uses_minimum_claim() {
        let mut engine = seeded_engine();
        // 100/210 is quote-heavy; optimal quote for 100 base is 200.
        engine
            .add_liquidity(
                &ctx("bob"),
                "TOKENA:TOKENB",
                dec!(100),
                dec!(210),
                Some(dec!(0.05)),
                None,
            )
            .unwrap();
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.base_quantity, dec!(1100));
        assert_eq!(pool.quote_quantity, dec!(2200));
        // A tenth of the pool: floor(1414.21356237 / 10) at 8 dp.
        let bob = engine.ledger().position(&pair(), "bob").unwrap();
        assert_eq!(bob.shares, dec!(141.42135623));
        // Only the adjusted quote amount left bob's balance.
        assert_eq!(engine.tokens().balance("bob", "TOKENB"), dec!(800));
        // Share conservation across all positions.
        assert_eq!(
            engine.ledger().position_share_total(&pair()),
            pool.total_shares
        );
        // The paged enumeration sees the same totals.
        let paged: Decimal = engine
            .positions(&pair())
            .flatten()
            .map(|position| position.shares)
            .sum();
        assert_eq!(paged, pool.total_shares);
    }

    #[test]
    fn test_unbalanced_deposit_rejected() {
        let mut engine = seeded_engine();
        // Optimal quote is 200; 250 supplied is a 20% trim.
        assert_eq!(
            engine.add_liquidity(
                &ctx("bob"),
                "TOKENA:TOKENB",
                dec!(100),
                dec!(250),
                Some(dec!(0.01)),
                None,
            ),
            Err(EngineError::SlippageExceeded)
        );
    }

    #[test]
    fn test_add_liquidity_requires_balances() {
        let mut engine = seeded_engine();
        assert_eq!(
            engine.add_liquidity(
                &ctx("bob"),
                "TOKENA:TOKENB",
                dec!(5000),
                dec!(10000),
                None,
                None,
            ),
            Err(EngineError::InsufficientBalance)
        );
    }

    #[test]
    fn test_time_factor_blends_on_growth() {
        let mut engine = seeded_engine();
        // Doubling the position 1000 seconds later moves the factor
        // halfway to the new timestamp.
        engine
            .add_liquidity(
                &ActionContext::new("alice", TS + 1000),
                "TOKENA:TOKENB",
                dec!(1000),
                dec!(2000),
                None,
                None,
            )
            .unwrap();
        let position = engine.ledger().position(&pair(), "alice").unwrap();
        assert_eq!(position.time_factor, TS + 500);

        // Withdrawal leaves the factor untouched.
        engine
            .remove_liquidity(
                &ActionContext::new("alice", TS + 5000),
                "TOKENA:TOKENB",
                dec!(50),
            )
            .unwrap();
        let position = engine.ledger().position(&pair(), "alice").unwrap();
        assert_eq!(position.time_factor, TS + 500);
    }

    #[test]
    fn test_swap_exact_input() {
        let mut engine = seeded_engine();
        let events = engine
            .swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TOKENA",
                dec!(10),
                TradeType::ExactInput,
                dec!(0.05),
            )
            .unwrap();
        assert_eq!(
            events,
            vec![EngineEvent::TokensSwapped {
                account: "bob".to_string(),
                symbol_in: "TOKENA".to_string(),
                symbol_out: "TOKENB".to_string(),
                amount_in: dec!(10),
                amount_out: dec!(19.80198019),
            }]
        );
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.base_quantity, dec!(1010));
        assert_eq!(pool.quote_quantity, dec!(1980.19801981));
        assert_eq!(pool.base_volume, dec!(10));
        assert_eq!(pool.quote_volume, dec!(19.80198019));
        assert_eq!(pool.base_price, dec!(1.96059210));
        // k preserved at pool precision.
        assert_eq!(
            round_sig(pool.k().unwrap(), pool.precision).unwrap(),
            round_sig(dec!(2000000), pool.precision).unwrap()
        );
        assert_eq!(engine.tokens().balance("bob", "TOKENA"), dec!(990));
        assert_eq!(
            engine.tokens().balance("bob", "TOKENB"),
            dec!(1019.80198019)
        );
    }

    #[test]
    fn test_swap_exact_output_rounds_input_up() {
        let mut engine = seeded_engine();
        engine
            .swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TOKENB",
                dec!(20),
                TradeType::ExactOutput,
                dec!(0.05),
            )
            .unwrap();
        // Exact input is 10.10101010..., ceiled at 8 dp.
        assert_eq!(
            engine.tokens().balance("bob", "TOKENA"),
            dec!(1000) - dec!(10.10101011)
        );
        assert_eq!(engine.tokens().balance("bob", "TOKENB"), dec!(1020));
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.base_quantity, dec!(1010.10101011));
        assert_eq!(pool.quote_quantity, dec!(1980));
        // Ceiling the input keeps k from decreasing.
        assert!(pool.k().unwrap() >= dec!(2000000));
    }

    #[test]
    fn test_swap_direction_quote_to_base() {
        let mut engine = seeded_engine();
        engine
            .swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TOKENB",
                dec!(20),
                TradeType::ExactInput,
                dec!(0.05),
            )
            .unwrap();
        // 20 * 1000 / 2020 = 9.90099009...
        assert_eq!(
            engine.tokens().balance("bob", "TOKENA"),
            dec!(1009.90099009)
        );
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.quote_quantity, dec!(2020));
        assert_eq!(pool.base_quantity, dec!(990.09900991));
    }

    #[test]
    fn test_swap_rejects_wrong_symbol_and_bad_amounts() {
        let mut engine = seeded_engine();
        assert_eq!(
            engine.swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TKN",
                dec!(10),
                TradeType::ExactInput,
                dec!(0.05),
            ),
            Err(EngineError::SymbolNotInPair)
        );
        assert_eq!(
            engine.swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TOKENA",
                dec!(0),
                TradeType::ExactInput,
                dec!(0.05),
            ),
            Err(EngineError::InvalidQuantity)
        );
        assert_eq!(
            engine.swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TOKENA",
                dec!(0.000000001),
                TradeType::ExactInput,
                dec!(0.05),
            ),
            Err(EngineError::PrecisionExceeded)
        );
    }

    #[test]
    fn test_swap_slippage_bound() {
        let mut engine = seeded_engine();
        // A 10-token swap moves the price ~2%.
        assert_eq!(
            engine.swap_tokens(
                &ctx("bob"),
                "TOKENA:TOKENB",
                "TOKENA",
                dec!(10),
                TradeType::ExactInput,
                dec!(0.01),
            ),
            Err(EngineError::SlippageExceeded)
        );
    }

    #[test]
    fn test_swap_requires_balance() {
        let mut engine = seeded_engine();
        // carol holds nothing; a small swap passes validation first.
        assert_eq!(
            engine.swap_tokens(
                &ctx("carol"),
                "TOKENA:TOKENB",
                "TOKENA",
                dec!(1),
                TradeType::ExactInput,
                dec!(0.05),
            ),
            Err(EngineError::InsufficientBalance)
        );
    }

    #[test]
    fn test_swap_output_exhaustion_rejected() {
        let mut engine = seeded_engine();
        assert_eq!(
            engine.swap_tokens(
                &ctx("alice"),
                "TOKENA:TOKENB",
                "TOKENB",
                dec!(2000),
                TradeType::ExactOutput,
                dec!(1000),
            ),
            Err(EngineError::Math(
                tidepool_domain::MathError::ReserveExhausted
            ))
        );
    }

    #[test]
    fn test_k_and_volumes_across_swap_sequence() {
        let mut engine = seeded_engine();
        let precision = engine.ledger().pool(&pair()).unwrap().precision;
        let k0 = round_sig(
            engine.ledger().pool(&pair()).unwrap().k().unwrap(),
            precision,
        )
        .unwrap();
        let mut last_base_volume = Decimal::ZERO;
        let mut last_quote_volume = Decimal::ZERO;
        let mut last_k = k0;
        for i in 0..6 {
            let (symbol, amount) = if i % 2 == 0 {
                ("TOKENA", dec!(5))
            } else {
                ("TOKENB", dec!(8))
            };
            engine
                .swap_tokens(
                    &ctx("bob"),
                    "TOKENA:TOKENB",
                    symbol,
                    amount,
                    TradeType::ExactInput,
                    dec!(0.05),
                )
                .unwrap();
            let pool = engine.ledger().pool(&pair()).unwrap();
            let k = round_sig(pool.k().unwrap(), precision).unwrap();
            // Invariant preserved at pool precision on every step, and
            // the raw product never decreases.
            assert_eq!(k, last_k);
            assert!(pool.k().unwrap() >= dec!(2000000));
            assert!(pool.base_volume >= last_base_volume);
            assert!(pool.quote_volume >= last_quote_volume);
            last_base_volume = pool.base_volume;
            last_quote_volume = pool.quote_volume;
            last_k = k;
        }
    }

    #[test]
    fn test_round_trip_swaps_never_profit() {
        let mut engine = seeded_engine();
        let start = engine.tokens().balance("bob", "TOKENA");
        for _ in 0..5 {
            engine
                .swap_tokens(
                    &ctx("bob"),
                    "TOKENA:TOKENB",
                    "TOKENA",
                    dec!(10),
                    TradeType::ExactInput,
                    dec!(0.05),
                )
                .unwrap();
            let received = engine.tokens().balance("bob", "TOKENB") - dec!(1000);
            engine
                .swap_tokens(
                    &ctx("bob"),
                    "TOKENA:TOKENB",
                    "TOKENB",
                    received,
                    TradeType::ExactInput,
                    dec!(0.05),
                )
                .unwrap();
            // Round-tripping through both directions can only lose to
            // rounding, never gain.
            assert!(engine.tokens().balance("bob", "TOKENA") <= start);
            assert_eq!(engine.tokens().balance("bob", "TOKENB"), dec!(1000));
        }
    }

    #[test]
    fn test_remove_liquidity_half() {
        let mut engine = seeded_engine();
        let events = engine
            .remove_liquidity(&ctx("alice"), "TOKENA:TOKENB", dec!(50))
            .unwrap();
        // Shares floor before the payout, so outputs land one dust unit
        // under half of each reserve.
        assert_eq!(
            events,
            vec![EngineEvent::LiquidityRemoved {
                account: "alice".to_string(),
                base_symbol: "TOKENA".to_string(),
                quote_symbol: "TOKENB".to_string(),
                base_quantity: dec!(499.99999999),
                quote_quantity: dec!(999.99999999),
            }]
        );
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.total_shares, dec!(707.10678119));
        assert_eq!(pool.base_quantity, dec!(500.00000001));
        assert_eq!(pool.quote_quantity, dec!(1000.00000001));
        assert_eq!(
            engine.ledger().position_share_total(&pair()),
            pool.total_shares
        );
        // Volume untouched by liquidity operations.
        assert_eq!(pool.base_volume, Decimal::ZERO);
    }

    #[test]
    fn test_remove_liquidity_full_deletes_position() {
        let mut engine = seeded_engine();
        engine
            .remove_liquidity(&ctx("alice"), "TOKENA:TOKENB", dec!(100))
            .unwrap();
        assert!(engine.ledger().position(&pair(), "alice").is_none());
        let pool = engine.ledger().pool(&pair()).unwrap();
        assert_eq!(pool.total_shares, Decimal::ZERO);
        assert_eq!(pool.base_quantity, Decimal::ZERO);
        assert_eq!(pool.quote_quantity, Decimal::ZERO);
        // Last prices preserved after the drain.
        assert_eq!(pool.base_price, dec!(2));
        assert_eq!(pool.quote_price, dec!(0.5));
    }

    #[test]
    fn test_remove_liquidity_validates_percent() {
        let mut engine = seeded_engine();
        for pct in [dec!(0), dec!(-5), dec!(100.001), dec!(12.3456)] {
            assert_eq!(
                engine.remove_liquidity(&ctx("alice"), "TOKENA:TOKENB", pct),
                Err(EngineError::InvalidSharesPercent)
            );
        }
        assert_eq!(
            engine.remove_liquidity(&ctx("bob"), "TOKENA:TOKENB", dec!(50)),
            Err(EngineError::PositionNotFound)
        );
    }

    #[test]
    fn test_add_then_remove_returns_no_more_than_deposited() {
        let mut engine = seeded_engine();
        engine
            .add_liquidity(
                &ctx("bob"),
                "TOKENA:TOKENB",
                dec!(100),
                dec!(200),
                None,
                None,
            )
            .unwrap();
        engine
            .remove_liquidity(&ctx("bob"), "TOKENA:TOKENB", dec!(100))
            .unwrap();
        assert!(engine.tokens().balance("bob", "TOKENA") <= dec!(1000));
        assert!(engine.tokens().balance("bob", "TOKENB") <= dec!(1000));
        assert!(engine.ledger().position(&pair(), "bob").is_none());
    }
}
