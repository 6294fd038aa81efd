//! Delta feed abstraction and the ingestion pipeline.
//!
//! The feed is a trait so transports can vary (websocket, replay file,
//! in-process channel in tests). Ingestion runs as two tasks joined by a
//! bounded channel: a reader that owns the feed connection and handles
//! reconnection, and an applier that merges blocks into the store. The
//! bounded channel keeps a burst of blocks from ballooning memory while the
//! store catches up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use sim_types::BlockDelta;
use state_pools::PoolStateStore;

use crate::config::IngestionConfig;
use crate::error::SimulationError;

/// Source of block-ordered state deltas.
#[async_trait]
pub trait DeltaFeed: Send + 'static {
    /// Establishes (or re-establishes) the upstream connection.
    async fn connect(&mut self) -> Result<(), SimulationError>;

    /// Next block of deltas. `Ok(None)` means the stream ended and the
    /// connection must be re-established.
    async fn next_block(&mut self) -> Result<Option<BlockDelta>, SimulationError>;
}

pub(crate) struct IngestionHandle {
    pub reader: JoinHandle<()>,
    pub applier: JoinHandle<()>,
}

impl IngestionHandle {
    pub fn abort(&self) {
        self.reader.abort();
        self.applier.abort();
    }
}

/// Spawns the ingestion pipeline. `first_block` fires once the first block
/// has been fully applied to the store.
pub(crate) fn spawn_ingestion<F: DeltaFeed>(
    mut feed: F,
    store: Arc<PoolStateStore>,
    config: IngestionConfig,
    degraded: Arc<AtomicBool>,
    first_block: oneshot::Sender<u64>,
) -> IngestionHandle {
    let (tx, mut rx) = mpsc::channel::<BlockDelta>(config.channel_capacity);

    let reader = tokio::spawn(async move {
        let mut attempts = 0u32;
        let mut backoff_ms = config.base_backoff_ms;

        loop {
            match feed.connect().await {
                Ok(()) => {
                    info!("state feed connected");
                    degraded.store(false, Ordering::SeqCst);
                    attempts = 0;
                    backoff_ms = config.base_backoff_ms;

                    loop {
                        match feed.next_block().await {
                            Ok(Some(block)) => {
                                // Applier gone means the client shut down.
                                if tx.send(block).await.is_err() {
                                    return;
                                }
                            }
                            Ok(None) => {
                                warn!("state feed stream ended");
                                break;
                            }
                            Err(e) => {
                                warn!(error = %e, "state feed read failed");
                                break;
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, "state feed connect failed"),
            }

            degraded.store(true, Ordering::SeqCst);
            attempts += 1;
            if attempts > config.max_reconnect_attempts {
                error!(
                    attempts = config.max_reconnect_attempts,
                    "state feed reconnection budget exhausted, giving up"
                );
                return;
            }

            let jitter = rand::thread_rng().gen_range(0..=backoff_ms / 4);
            debug!(attempt = attempts, backoff_ms, "reconnecting to state feed");
            sleep(Duration::from_millis(backoff_ms + jitter)).await;
            backoff_ms = backoff_ms.saturating_mul(2).min(config.max_backoff_ms);
        }
    });

    let applier = tokio::spawn(async move {
        let mut first = Some(first_block);
        while let Some(block) = rx.recv().await {
            let outcome = store.apply_block(&block);
            debug!(
                block = block.block,
                applied = outcome.applied,
                stale = outcome.stale,
                orphaned = outcome.orphaned,
                invalid = outcome.invalid,
                "block applied"
            );
            if let Some(signal) = first.take() {
                let _ = signal.send(block.block);
            }
        }
    });

    IngestionHandle { reader, applier }
}
