//! # Pool State Store - Block-Ordered Market State
//!
//! ## Purpose
//!
//! In-memory store for every tracked pool, fed exclusively by block deltas
//! from the ingestion feed. Guarantees that pool state only moves forward in
//! block height: stale and replayed deltas are counted and dropped, partial
//! updates merge field by field, and readers always see a complete snapshot
//! of a pool rather than a torn write.
//!
//! ## Integration Points
//!
//! - **Input Sources**: `BlockDelta` stream from the simulation client's
//!   ingestion task
//! - **Output Destinations**: quote orchestrator and spot price aggregation
//!   (cloned `PoolSnapshot`s), operational stats on the client surface
//! - **Persistence**: bincode snapshot/restore of the full store
//!
//! ## Architecture Role
//!
//! The store is the single source of truth for market state. Quoting never
//! locks the store: lookups clone the snapshot under a short read lock and
//! all math runs on the clone, so a slow quote cannot stall ingestion.

pub mod snapshot;
pub mod store;

pub use store::{BlockOutcome, DeltaOutcome, PoolStateStore, StoreError, StoreStats};
