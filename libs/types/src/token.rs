//! Token metadata delivered by the state feed.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// A tracked ERC-20 style token.
///
/// `decimals` must be known before any amount conversion; pools referencing
/// tokens without metadata are excluded from quoting. `symbol` is purely
/// informational and never enters the math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }
}
