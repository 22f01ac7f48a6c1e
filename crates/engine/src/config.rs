//! Engine configuration.
//!
//! The source system kept fee and guard parameters in a process-wide
//! singleton; here they are an explicit value handed to the engine at
//! construction so instances stay testable in isolation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters governing pool creation and the default guard bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fee burned on pool creation, denominated in `fee_symbol`. Zero
    /// waives the fee for everyone.
    pub pool_creation_fee: Decimal,
    /// Token the creation fee is paid in.
    pub fee_symbol: String,
    /// Account exempt from the creation fee, if any.
    pub fee_exempt_account: Option<String>,
    /// Account holding pooled reserves in custody.
    pub custody_account: String,
    /// Sink account for burned fees.
    pub burn_account: String,
    /// Symbol whose oracle reference price is fixed at 1.
    pub peg_symbol: String,
    /// Default maximum price slippage per operation (fraction).
    pub default_max_slippage: Decimal,
    /// Default maximum oracle deviation for first deposits (fraction).
    pub default_max_deviation: Decimal,
    /// Page size for the liquidity-position iterator.
    pub position_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_creation_fee: Decimal::new(1000, 0),
            fee_symbol: "TKN".to_string(),
            fee_exempt_account: None,
            custody_account: "tidepool".to_string(),
            burn_account: "null".to_string(),
            peg_symbol: "TKN".to_string(),
            default_max_slippage: Decimal::new(1, 2),
            default_max_deviation: Decimal::new(1, 2),
            position_page_size: 500,
        }
    }
}
