//! Pool ledger: owner and sole writer of pool and position records.
//!
//! Action handlers compute and validate a change, then commit it through
//! [`PoolLedger::update_pool_stats`] and the position methods here. No
//! other component persists changes to these records.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tidepool_domain::decimal::add;
use tidepool_domain::{LiquidityPosition, Pool, TokenPair};

use crate::error::EngineError;

/// Reserve/share/volume change applied atomically to one pool.
///
/// Reserve and share deltas are signed; volume deltas are absolute
/// increments and are only non-zero for swaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolDelta {
    pub base: Decimal,
    pub quote: Decimal,
    pub shares: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
}

/// In-memory record store keyed by canonical pair string.
#[derive(Debug, Clone, Default)]
pub struct PoolLedger {
    pools: BTreeMap<String, Pool>,
    positions: BTreeMap<(String, String), LiquidityPosition>,
}

impl PoolLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a freshly created pool. Callers must have checked
    /// uniqueness beforehand.
    pub fn insert_pool(&mut self, pool: Pool) {
        self.pools.insert(pool.token_pair.to_string(), pool);
    }

    /// Looks up a pool by exact pair ordering.
    #[must_use]
    pub fn pool(&self, pair: &TokenPair) -> Option<&Pool> {
        self.pools.get(&pair.to_string())
    }

    /// Whether a pool exists under this pair or its reverse ordering.
    #[must_use]
    pub fn contains_pair_or_reverse(&self, pair: &TokenPair) -> bool {
        self.pools.contains_key(&pair.to_string())
            || self.pools.contains_key(&pair.reversed().to_string())
    }

    /// All pools, in key order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Looks up an account's position in a pool.
    #[must_use]
    pub fn position(&self, pair: &TokenPair, account: &str) -> Option<&LiquidityPosition> {
        self.positions
            .get(&(pair.to_string(), account.to_string()))
    }

    /// Inserts or replaces a position record.
    pub fn upsert_position(&mut self, position: LiquidityPosition) {
        let key = (position.token_pair.to_string(), position.account.clone());
        self.positions.insert(key, position);
    }

    /// Deletes a position record, returning it if present.
    pub fn remove_position(
        &mut self,
        pair: &TokenPair,
        account: &str,
    ) -> Option<LiquidityPosition> {
        self.positions
            .remove(&(pair.to_string(), account.to_string()))
    }

    /// Lazy, restartable page iterator over a pool's positions, bounded
    /// by an explicit page size. Consumers enumerating positions (e.g.
    /// an external reward distribution) page through this instead of
    /// scanning until a short page.
    #[must_use]
    pub fn positions_for<'a>(&'a self, pair: &TokenPair, page_size: usize) -> PositionPages<'a> {
        PositionPages {
            ledger: self,
            pair_key: pair.to_string(),
            page_size: page_size.max(1),
            offset: 0,
        }
    }

    /// Sum of all position shares for a pair. Equals the pool's
    /// `total_shares` after every add/remove.
    #[must_use]
    pub fn position_share_total(&self, pair: &TokenPair) -> Decimal {
        let key = pair.to_string();
        self.positions
            .range((key.clone(), String::new())..)
            .take_while(|((pair_key, _), _)| *pair_key == key)
            .map(|(_, position)| position.shares)
            .sum()
    }

    /// Applies a validated delta to a pool and recomputes derived
    /// prices. The update is all-or-nothing: the stored record is only
    /// replaced once every checked operation has succeeded.
    ///
    /// # Errors
    /// [`EngineError::PoolNotFound`] for an unknown pair,
    /// [`EngineError::InsufficientLiquidity`] if a reserve or the share
    /// total would go negative, or arithmetic overflow.
    pub fn update_pool_stats(
        &mut self,
        pair: &TokenPair,
        delta: &PoolDelta,
    ) -> Result<(), EngineError> {
        let key = pair.to_string();
        let pool = self.pools.get(&key).ok_or(EngineError::PoolNotFound)?;
        let mut updated = pool.clone();
        updated.base_quantity = add(updated.base_quantity, delta.base)?;
        updated.quote_quantity = add(updated.quote_quantity, delta.quote)?;
        updated.total_shares = add(updated.total_shares, delta.shares)?;
        if updated.base_quantity < Decimal::ZERO
            || updated.quote_quantity < Decimal::ZERO
            || updated.total_shares < Decimal::ZERO
        {
            return Err(EngineError::InsufficientLiquidity);
        }
        updated.base_volume = add(updated.base_volume, delta.base_volume.abs())?;
        updated.quote_volume = add(updated.quote_volume, delta.quote_volume.abs())?;
        updated.update_prices()?;
        debug!(
            pair = %key,
            base = %updated.base_quantity,
            quote = %updated.quote_quantity,
            shares = %updated.total_shares,
            "pool stats updated"
        );
        self.pools.insert(key, updated);
        Ok(())
    }

    /// Serializable copy of the whole ledger.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            pools: self.pools.values().map(PoolSnapshot::from).collect(),
            positions: self.positions.values().cloned().collect(),
        }
    }

    /// Rebuilds a ledger from a snapshot, defaulting fields that older
    /// record versions lack.
    #[must_use]
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        let mut ledger = Self::new();
        for pool in snapshot.pools {
            ledger.insert_pool(Pool::from(pool));
        }
        for position in snapshot.positions {
            ledger.upsert_position(position);
        }
        ledger
    }
}

/// Page iterator returned by [`PoolLedger::positions_for`].
pub struct PositionPages<'a> {
    ledger: &'a PoolLedger,
    pair_key: String,
    page_size: usize,
    offset: usize,
}

impl<'a> Iterator for PositionPages<'a> {
    type Item = Vec<&'a LiquidityPosition>;

    fn next(&mut self) -> Option<Self::Item> {
        let page: Vec<&'a LiquidityPosition> = self
            .ledger
            .positions
            .range((self.pair_key.clone(), String::new())..)
            .take_while(|((pair_key, _), _)| *pair_key == self.pair_key)
            .skip(self.offset)
            .take(self.page_size)
            .map(|(_, position)| position)
            .collect();
        if page.is_empty() {
            None
        } else {
            self.offset += page.len();
            Some(page)
        }
    }
}

/// Versioned on-disk shape of a pool record. Older `V1` records predate
/// volume tracking; loading one defaults both volumes to zero instead of
/// sprinkling presence checks through the logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum PoolSnapshot {
    V1 {
        token_pair: TokenPair,
        base_quantity: Decimal,
        quote_quantity: Decimal,
        base_price: Decimal,
        quote_price: Decimal,
        total_shares: Decimal,
        precision: u32,
        creator: String,
    },
    V2 {
        token_pair: TokenPair,
        base_quantity: Decimal,
        quote_quantity: Decimal,
        base_price: Decimal,
        quote_price: Decimal,
        base_volume: Decimal,
        quote_volume: Decimal,
        total_shares: Decimal,
        precision: u32,
        creator: String,
    },
}

impl From<&Pool> for PoolSnapshot {
    fn from(pool: &Pool) -> Self {
        PoolSnapshot::V2 {
            token_pair: pool.token_pair.clone(),
            base_quantity: pool.base_quantity,
            quote_quantity: pool.quote_quantity,
            base_price: pool.base_price,
            quote_price: pool.quote_price,
            base_volume: pool.base_volume,
            quote_volume: pool.quote_volume,
            total_shares: pool.total_shares,
            precision: pool.precision,
            creator: pool.creator.clone(),
        }
    }
}

impl From<PoolSnapshot> for Pool {
    fn from(snapshot: PoolSnapshot) -> Self {
        match snapshot {
            PoolSnapshot::V1 {
                token_pair,
                base_quantity,
                quote_quantity,
                base_price,
                quote_price,
                total_shares,
                precision,
                creator,
            } => Pool {
                token_pair,
                base_quantity,
                quote_quantity,
                base_price,
                quote_price,
                base_volume: Decimal::ZERO,
                quote_volume: Decimal::ZERO,
                total_shares,
                precision,
                creator,
            },
            PoolSnapshot::V2 {
                token_pair,
                base_quantity,
                quote_quantity,
                base_price,
                quote_price,
                base_volume,
                quote_volume,
                total_shares,
                precision,
                creator,
            } => Pool {
                token_pair,
                base_quantity,
                quote_quantity,
                base_price,
                quote_price,
                base_volume,
                quote_volume,
                total_shares,
                precision,
                creator,
            },
        }
    }
}

/// Serializable ledger state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub pools: Vec<PoolSnapshot>,
    pub positions: Vec<LiquidityPosition>,
}
