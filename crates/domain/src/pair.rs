//! Token pair identifier.
//!
//! A pool is keyed by a canonical `"BASE:QUOTE"` string. The ordering is
//! fixed when the pool is created and never swapped afterwards; the
//! reversed pair is only ever used to detect duplicate pools.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PairError;

/// Separator between the base and quote symbols. Not a valid symbol
/// character, so the split is unambiguous.
pub const PAIR_SEPARATOR: char = ':';

const MAX_SYMBOL_LEN: usize = 10;

/// An ordered token pair, e.g. `TOKENA:TOKENB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenPair {
    base: String,
    quote: String,
}

impl TokenPair {
    /// Builds a pair from two symbols, validating both.
    ///
    /// # Errors
    /// Returns [`PairError::InvalidSymbol`] or
    /// [`PairError::IdenticalSymbols`] on malformed input.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Result<Self, PairError> {
        let base = base.into();
        let quote = quote.into();
        if !is_valid_symbol(&base) || !is_valid_symbol(&quote) {
            return Err(PairError::InvalidSymbol);
        }
        if base == quote {
            return Err(PairError::IdenticalSymbols);
        }
        Ok(Self { base, quote })
    }

    /// Base (first) symbol.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Quote (second) symbol.
    #[must_use]
    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// The same pair with base and quote swapped. Used only for the
    /// duplicate-pool check at creation time.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    /// Whether `symbol` is one of the two legs.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.base == symbol || self.quote == symbol
    }

    /// The other leg of the pair, if `symbol` is one of the legs.
    #[must_use]
    pub fn other(&self, symbol: &str) -> Option<&str> {
        if symbol == self.base {
            Some(&self.quote)
        } else if symbol == self.quote {
            Some(&self.base)
        } else {
            None
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, PAIR_SEPARATOR, self.quote)
    }
}

impl FromStr for TokenPair {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(PAIR_SEPARATOR);
        let (Some(base), Some(quote), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(PairError::InvalidFormat);
        };
        Self::new(base, quote)
    }
}

impl TryFrom<String> for TokenPair {
    type Error = PairError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenPair> for String {
    fn from(pair: TokenPair) -> Self {
        pair.to_string()
    }
}

fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let pair: TokenPair = "TOKENA:TOKENB".parse().unwrap();
        assert_eq!(pair.base(), "TOKENA");
        assert_eq!(pair.quote(), "TOKENB");
        assert_eq!(pair.to_string(), "TOKENA:TOKENB");
    }

    #[test]
    fn test_reversed_swaps_legs() {
        let pair: TokenPair = "AAA:BBB".parse().unwrap();
        assert_eq!(pair.reversed().to_string(), "BBB:AAA");
    }

    #[test]
    fn test_other_leg() {
        let pair: TokenPair = "AAA:BBB".parse().unwrap();
        assert_eq!(pair.other("AAA"), Some("BBB"));
        assert_eq!(pair.other("BBB"), Some("AAA"));
        assert_eq!(pair.other("CCC"), None);
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!("TOKENA".parse::<TokenPair>(), Err(PairError::InvalidFormat));
        assert_eq!("A:B:C".parse::<TokenPair>(), Err(PairError::InvalidFormat));
        assert_eq!("aaa:BBB".parse::<TokenPair>(), Err(PairError::InvalidSymbol));
        assert_eq!(":BBB".parse::<TokenPair>(), Err(PairError::InvalidSymbol));
        assert_eq!(
            "AAA:AAA".parse::<TokenPair>(),
            Err(PairError::IdenticalSymbols)
        );
        assert_eq!(
            "TOOLONGSYMBOL:BBB".parse::<TokenPair>(),
            Err(PairError::InvalidSymbol)
        );
    }
}
