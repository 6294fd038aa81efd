//! Client-facing error taxonomy.

use sim_types::Address;
use thiserror::Error;

/// Errors surfaced on the simulation client API.
///
/// Per-pool math failures never appear here: the quote orchestrator absorbs
/// them into sentinel results so one broken pool cannot fail a batch.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Invalid or inconsistent configuration, rejected before any work runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed token address argument.
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] sim_types::AddressError),

    /// No eligible pool serves the requested pair.
    #[error("No liquidity for pair {base} / {quote}")]
    NoLiquidity { base: Address, quote: Address },

    /// A token address the client has no metadata for.
    #[error("Unknown token {0}")]
    UnknownToken(Address),

    /// The delta feed is unreachable or stopped delivering.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Snapshot persistence failure.
    #[error("State store error: {0}")]
    Store(#[from] state_pools::StoreError),
}
