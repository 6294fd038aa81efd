//! The simulation client facade.
//!
//! `connect` validates configuration, spawns the ingestion pipeline, and
//! blocks until the first block has been applied, so a constructed client
//! always has real market state behind it. All query methods read cloned
//! snapshots; none of them can observe a half-applied block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use sim_types::parse_address;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::info;

use state_pools::{PoolStateStore, StoreStats};

use crate::config::ClientConfig;
use crate::error::SimulationError;
use crate::feed::{spawn_ingestion, DeltaFeed, IngestionHandle};
use crate::orchestrator::{batch_quotes, AmountOutResult};
use crate::routing::eligible_pools;
use crate::spot::aggregate_spot_price;

/// Live handle to the simulated market.
pub struct SimulationClient {
    store: Arc<PoolStateStore>,
    config: ClientConfig,
    degraded: Arc<AtomicBool>,
    ingestion: IngestionHandle,
}

impl SimulationClient {
    /// Connects to the feed and waits for the first block of state.
    ///
    /// Fails with `Configuration` on invalid settings and with
    /// `UpstreamUnavailable` when no block arrives within the configured
    /// timeout.
    pub async fn connect<F: DeltaFeed>(
        config: ClientConfig,
        feed: F,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let store = Arc::new(PoolStateStore::new());
        let degraded = Arc::new(AtomicBool::new(true));
        let (first_tx, first_rx) = oneshot::channel();

        let ingestion = spawn_ingestion(
            feed,
            Arc::clone(&store),
            config.ingestion.clone(),
            Arc::clone(&degraded),
            first_tx,
        );

        let wait = Duration::from_secs(config.ingestion.first_block_timeout_secs);
        match timeout(wait, first_rx).await {
            Ok(Ok(block)) => {
                info!(block, pools = store.pool_count(), "initial state loaded");
                Ok(Self {
                    store,
                    config,
                    degraded,
                    ingestion,
                })
            }
            Ok(Err(_)) => {
                ingestion.abort();
                Err(SimulationError::UpstreamUnavailable(
                    "feed stopped before delivering the first block".to_string(),
                ))
            }
            Err(_) => {
                ingestion.abort();
                Err(SimulationError::UpstreamUnavailable(format!(
                    "no block within {}s",
                    config.ingestion.first_block_timeout_secs
                )))
            }
        }
    }

    /// TVL-weighted spot price of one unit of `base` in `quote` across all
    /// eligible pools for the pair.
    ///
    /// Addresses are hex strings, case-insensitive, `0x` prefix optional.
    pub async fn get_spot_price(&self, base: &str, quote: &str) -> Result<f64, SimulationError> {
        let base = self.resolve_token(base)?;
        let quote = self.resolve_token(quote)?;

        let pools = eligible_pools(&self.store, base, quote, self.config.tvl_threshold_usd);
        aggregate_spot_price(&pools, base, quote)
    }

    /// Simulates every amount against every eligible pool for the pair.
    ///
    /// An empty result means no pool currently serves the pair; per-amount
    /// failures inside a pool appear as (0, 0) rows.
    pub async fn get_amount_out(
        &self,
        token_in: &str,
        token_out: &str,
        amounts: &[U256],
    ) -> Result<Vec<AmountOutResult>, SimulationError> {
        let token_in = self.resolve_token(token_in)?;
        let token_out = self.resolve_token(token_out)?;

        let pools = eligible_pools(
            &self.store,
            token_in,
            token_out,
            self.config.tvl_threshold_usd,
        );
        Ok(batch_quotes(pools, token_in, amounts.to_vec()).await)
    }

    /// True while the feed connection is down; quotes still run over the
    /// last applied state.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Serialized store state for warm restarts.
    pub fn snapshot(&self) -> Result<Vec<u8>, SimulationError> {
        Ok(self.store.snapshot()?)
    }

    /// Parses an address argument and checks it against the token registry.
    fn resolve_token(&self, token: &str) -> Result<Address, SimulationError> {
        let address = parse_address(token)?;
        if self.store.token(address).is_none() {
            return Err(SimulationError::UnknownToken(address));
        }
        Ok(address)
    }
}

impl Drop for SimulationClient {
    fn drop(&mut self) {
        self.ingestion.abort();
    }
}
