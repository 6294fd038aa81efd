//! End-to-end client tests over an in-process delta feed.

use std::collections::VecDeque;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal_macros::dec;

use sim_types::{
    BlockDelta, CurveUpdate, PoolDelta, PoolDescriptor, PoolVariant, TokenInfo,
};
use simulation_client::{
    ClientConfig, DeltaFeed, SimulationClient, SimulationError,
};

fn addr(byte: u8) -> Address {
    Address::from([byte; 20])
}

fn hex_addr(byte: u8) -> String {
    format!("0x{}", format!("{byte:02x}").repeat(20))
}

const WETH: u8 = 1;
const USDC: u8 = 2;
const DAI: u8 = 3;

/// Feed that replays scripted blocks, then either stays open forever or
/// drops the connection and refuses to reconnect.
struct ScriptedFeed {
    blocks: VecDeque<BlockDelta>,
    hold_open: bool,
    connected_once: bool,
}

impl ScriptedFeed {
    fn new(blocks: Vec<BlockDelta>, hold_open: bool) -> Self {
        Self {
            blocks: blocks.into(),
            hold_open,
            connected_once: false,
        }
    }
}

#[async_trait]
impl DeltaFeed for ScriptedFeed {
    async fn connect(&mut self) -> Result<(), SimulationError> {
        if self.connected_once && !self.hold_open {
            return Err(SimulationError::UpstreamUnavailable(
                "scripted feed refuses reconnection".to_string(),
            ));
        }
        self.connected_once = true;
        Ok(())
    }

    async fn next_block(&mut self) -> Result<Option<BlockDelta>, SimulationError> {
        match self.blocks.pop_front() {
            Some(block) => Ok(Some(block)),
            None if self.hold_open => futures::future::pending().await,
            None => Ok(None),
        }
    }
}

fn weth_usdc_block(block: u64) -> BlockDelta {
    BlockDelta {
        block,
        tokens: vec![
            TokenInfo::new(addr(WETH), "WETH", 18),
            TokenInfo::new(addr(USDC), "USDC", 6),
            // Known token with no pool behind it.
            TokenInfo::new(addr(DAI), "DAI", 18),
        ],
        deltas: vec![
            PoolDelta {
                pool: addr(0xAA),
                block,
                descriptor: Some(PoolDescriptor {
                    address: addr(0xAA),
                    token0: addr(WETH),
                    token1: addr(USDC),
                    fee_bps: 30,
                    variant: PoolVariant::ConstantProduct,
                }),
                curve: Some(CurveUpdate {
                    reserve0: Some(U256::from(1000u64)),
                    reserve1: Some(U256::from(2000u64)),
                    ..Default::default()
                }),
                tvl_usd: Some(dec!(50_000)),
                active: None,
            },
            // Below the default 100 USD TVL floor, must never quote.
            PoolDelta {
                pool: addr(0xBB),
                block,
                descriptor: Some(PoolDescriptor {
                    address: addr(0xBB),
                    token0: addr(WETH),
                    token1: addr(USDC),
                    fee_bps: 30,
                    variant: PoolVariant::ConstantProduct,
                }),
                curve: Some(CurveUpdate {
                    reserve0: Some(U256::from(10u64)),
                    reserve1: Some(U256::from(20u64)),
                    ..Default::default()
                }),
                tvl_usd: Some(dec!(5)),
                active: None,
            },
        ],
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn fast_config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.ingestion.base_backoff_ms = 1;
    config.ingestion.max_backoff_ms = 2;
    config.ingestion.max_reconnect_attempts = 2;
    config.ingestion.first_block_timeout_secs = 5;
    config
}

#[tokio::test]
async fn connect_applies_first_block_before_returning() {
    init_tracing();
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    let stats = client.stats();
    assert_eq!(stats.last_block, 100);
    assert_eq!(stats.total_pools, 2);
    assert!(!client.is_degraded());
}

#[tokio::test]
async fn batch_quotes_filter_by_tvl_and_preserve_order() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    let results = client
        .get_amount_out(&hex_addr(WETH), &hex_addr(USDC), &[U256::from(100u64)])
        .await
        .unwrap();

    // The 5 USD pool is filtered; only the deep pool answers.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].pool, addr(0xAA));
    assert_eq!(results[0].amounts_out, vec![U256::from(181u64)]);
}

#[tokio::test]
async fn spot_price_reflects_reserves() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    // reserve ratio 2.0 adjusted by 10^(18-6).
    let price = client.get_spot_price(&hex_addr(WETH), &hex_addr(USDC)).await.unwrap();
    assert!((price - 2.0e12).abs() / 2.0e12 < 1e-9);

    let reverse = client.get_spot_price(&hex_addr(USDC), &hex_addr(WETH)).await.unwrap();
    assert!((reverse - 0.5e-12).abs() / 0.5e-12 < 1e-9);
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    let result = client
        .get_amount_out(&hex_addr(WETH), &hex_addr(99), &[U256::from(1u64)])
        .await;
    assert!(matches!(result, Err(SimulationError::UnknownToken(_))));
}

#[tokio::test]
async fn pair_without_pools_is_empty_quotes_and_no_liquidity_price() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    let results = client
        .get_amount_out(&hex_addr(WETH), &hex_addr(DAI), &[U256::from(100u64)])
        .await
        .unwrap();
    assert!(results.is_empty());

    let price = client.get_spot_price(&hex_addr(WETH), &hex_addr(DAI)).await;
    assert!(matches!(price, Err(SimulationError::NoLiquidity { .. })));
}

#[tokio::test]
async fn malformed_address_is_rejected() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    let result = client
        .get_amount_out("0xnot-an-address", &hex_addr(USDC), &[U256::from(1u64)])
        .await;
    assert!(matches!(result, Err(SimulationError::InvalidAddress(_))));

    // Uppercase hex without prefix parses fine.
    let upper = hex_addr(WETH).trim_start_matches("0x").to_uppercase();
    assert!(client
        .get_spot_price(&upper, &hex_addr(USDC))
        .await
        .is_ok());
}

#[tokio::test]
async fn later_blocks_update_state_and_stale_ones_do_not() {
    let mut second = BlockDelta::new(101);
    second.deltas.push(PoolDelta::update(
        addr(0xAA),
        101,
        CurveUpdate {
            reserve0: Some(U256::from(4000u64)),
            reserve1: Some(U256::from(2000u64)),
            ..Default::default()
        },
    ));
    // Replay of block 100 arriving late must be a no-op.
    let stale = weth_usdc_block(100);

    let feed = ScriptedFeed::new(vec![weth_usdc_block(100), second, stale], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    // Give the applier time to drain the remaining blocks.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = client.stats();
    assert_eq!(stats.last_block, 101);
    assert!(stats.stale_deltas_dropped >= 2);

    let price = client.get_spot_price(&hex_addr(WETH), &hex_addr(USDC)).await.unwrap();
    assert!((price - 0.5e12).abs() / 0.5e12 < 1e-9);
}

#[tokio::test]
async fn dead_feed_degrades_but_keeps_serving_last_state() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], false);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    // Feed ends after the first block and refuses reconnection; wait out the
    // two 1-2ms reconnect attempts.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(client.is_degraded());

    let results = client
        .get_amount_out(&hex_addr(WETH), &hex_addr(USDC), &[U256::from(100u64)])
        .await
        .unwrap();
    assert_eq!(results[0].amounts_out, vec![U256::from(181u64)]);
}

#[tokio::test]
async fn connect_fails_when_feed_never_produces() {
    let mut config = fast_config();
    config.ingestion.first_block_timeout_secs = 1;

    let feed = ScriptedFeed::new(vec![], false);
    let result = SimulationClient::connect(config, feed).await;
    assert!(matches!(
        result,
        Err(SimulationError::UpstreamUnavailable(_))
    ));
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let feed = ScriptedFeed::new(vec![weth_usdc_block(100)], true);
    let client = SimulationClient::connect(fast_config(), feed)
        .await
        .unwrap();

    let bytes = client.snapshot().unwrap();
    assert!(!bytes.is_empty());

    let store = state_pools::PoolStateStore::new();
    store.restore(&bytes).unwrap();
    assert_eq!(store.pool_count(), 2);
    assert_eq!(store.stats().last_block, 100);
}
