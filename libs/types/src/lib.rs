//! # Simulation Types - Shared Domain Model
//!
//! ## Purpose
//!
//! Unified type system for the swap simulation engine: token and pool
//! identities, per-protocol curve state, and the incremental delta format
//! delivered by the upstream state feed. Every other crate in the workspace
//! builds on these definitions, so this crate stays dependency-light and
//! contains no simulation logic of its own.
//!
//! ## Integration Points
//!
//! - **Consumed by**: `poolsim-amm` (curve state for quoting), `state-pools`
//!   (snapshot storage and delta merging), `simulation-client` (public API
//!   surface)
//! - **Numerics**: amounts are `alloy_primitives::U256` (256-bit integers,
//!   truncating division); TVL valuations are `rust_decimal::Decimal` USD
//! - **Addresses**: 20-byte Ethereum-style, parsed case-insensitively with
//!   an optional `0x` prefix

pub mod address;
pub mod delta;
pub mod pool;
pub mod token;

pub use address::{parse_address, AddressError};
pub use delta::{BlockDelta, CurveUpdate, PoolDelta};
pub use pool::{sorted_pair, CurveState, PoolDescriptor, PoolSnapshot, PoolVariant, TickInfo};
pub use token::TokenInfo;

// Re-exported so downstream crates agree on one numeric stack.
pub use alloy_primitives::{Address, I256, U256};
pub use rust_decimal::Decimal;
