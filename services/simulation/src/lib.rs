//! # Simulation Client - Streaming Swap Simulation Engine
//!
//! ## Purpose
//!
//! Client library for simulating swaps against live on-chain liquidity.
//! Maintains an in-memory mirror of pool state from a streaming delta feed
//! and answers two questions about any token pair: the current aggregate
//! spot price, and the exact output of swapping given input amounts through
//! each individual pool.
//!
//! ## Integration Points
//!
//! - **Input Sources**: block-ordered `BlockDelta` stream via the
//!   [`DeltaFeed`] trait (websocket in production, in-process in tests)
//! - **Output Destinations**: embedding applications (routers, monitoring,
//!   strategy research) via [`SimulationClient`]
//! - **State**: `state-pools` store, `poolsim-amm` math engine
//! - **Degraded Mode**: the feed reconnects with exponential backoff; while
//!   down the client keeps answering from the last applied block and reports
//!   [`SimulationClient::is_degraded`]
//!
//! ## Architecture Role
//!
//! ```text
//! Delta Feed → [Ingestion Pipeline] → Pool State Store
//!                                          ↓
//!               Batch Quote Orchestrator ← ┤
//!               Spot Price Aggregation  ← ─┘
//!                        ↓
//!               SimulationClient API
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod orchestrator;
pub mod routing;
pub mod spot;

pub use client::SimulationClient;
pub use config::{ClientConfig, IngestionConfig};
pub use error::SimulationError;
pub use feed::DeltaFeed;
pub use orchestrator::AmountOutResult;
