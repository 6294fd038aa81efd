//! # Simulation Client Configuration
//!
//! ## Purpose
//!
//! Runtime parameter control for the simulation client without hardcoded
//! values. Supports environment variable overrides and validation for the
//! upstream endpoint, pool eligibility filtering, and ingestion behavior.
//!
//! ## Integration Points
//!
//! - **Input Sources**: environment variables, programmatic construction
//! - **Output Destinations**: `SimulationClient::connect`, ingestion task
//! - **Validation**: endpoint URL scheme, threshold sign, channel and
//!   backoff bounds, all checked before any connection is attempted

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Complete configuration for the simulation client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Upstream state feed endpoint (ws, wss, http or https).
    pub endpoint_url: String,
    /// Optional bearer credential for the upstream feed.
    pub api_key: Option<String>,
    /// Pools below this USD valuation are excluded from quoting.
    pub tvl_threshold_usd: Decimal,
    /// Ingestion and reconnection parameters.
    pub ingestion: IngestionConfig,
}

/// Feed ingestion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Bounded capacity of the feed-to-store channel.
    pub channel_capacity: usize,
    /// Base backoff time for reconnection
    pub base_backoff_ms: u64,
    /// Maximum backoff time
    pub max_backoff_ms: u64,
    /// Maximum reconnection attempts before the feed is abandoned.
    pub max_reconnect_attempts: u32,
    /// How long `connect` waits for the first block before failing.
    pub first_block_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "ws://127.0.0.1:8900/deltas".to_string(),
            api_key: None,
            tvl_threshold_usd: dec!(100),
            ingestion: IngestionConfig::default(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
            base_backoff_ms: 1000,
            max_backoff_ms: 30000,
            max_reconnect_attempts: 10,
            first_block_timeout_secs: 60,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, SimulationError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SimulationError::Configuration(format!("cannot read config file {path}: {e}"))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            SimulationError::Configuration(format!("cannot parse config file {path}: {e}"))
        })?;
        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON.
    pub fn save_to_file(&self, path: &str) -> Result<(), SimulationError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            SimulationError::Configuration(format!("cannot serialize config: {e}"))
        })?;
        std::fs::write(path, json).map_err(|e| {
            SimulationError::Configuration(format!("cannot write config file {path}: {e}"))
        })?;
        Ok(())
    }

    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SIMULATION_ENDPOINT_URL") {
            config.endpoint_url = url;
        }
        if let Ok(key) = std::env::var("SIMULATION_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(threshold) = std::env::var("SIMULATION_TVL_THRESHOLD_USD") {
            if let Ok(value) = threshold.parse::<f64>() {
                config.tvl_threshold_usd =
                    Decimal::from_f64_retain(value).unwrap_or(config.tvl_threshold_usd);
            }
        }
        if let Ok(capacity) = std::env::var("SIMULATION_CHANNEL_CAPACITY") {
            if let Ok(value) = capacity.parse::<usize>() {
                config.ingestion.channel_capacity = value;
            }
        }
        if let Ok(backoff) = std::env::var("SIMULATION_BASE_BACKOFF_MS") {
            if let Ok(value) = backoff.parse::<u64>() {
                config.ingestion.base_backoff_ms = value;
            }
        }
        if let Ok(backoff) = std::env::var("SIMULATION_MAX_BACKOFF_MS") {
            if let Ok(value) = backoff.parse::<u64>() {
                config.ingestion.max_backoff_ms = value;
            }
        }
        if let Ok(attempts) = std::env::var("SIMULATION_MAX_RECONNECT_ATTEMPTS") {
            if let Ok(value) = attempts.parse::<u32>() {
                config.ingestion.max_reconnect_attempts = value;
            }
        }

        config
    }

    /// Validates the configuration, returning a detailed error on the first
    /// problem found.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let url = url::Url::parse(&self.endpoint_url).map_err(|e| {
            SimulationError::Configuration(format!("invalid endpoint URL: {e}"))
        })?;
        if !matches!(url.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(SimulationError::Configuration(format!(
                "unsupported endpoint scheme: {}",
                url.scheme()
            )));
        }
        if self.tvl_threshold_usd.is_sign_negative() {
            return Err(SimulationError::Configuration(
                "tvl_threshold_usd must not be negative".to_string(),
            ));
        }
        if self.ingestion.channel_capacity == 0 {
            return Err(SimulationError::Configuration(
                "channel_capacity must be positive".to_string(),
            ));
        }
        if self.ingestion.base_backoff_ms == 0
            || self.ingestion.base_backoff_ms > self.ingestion.max_backoff_ms
        {
            return Err(SimulationError::Configuration(
                "backoff bounds must satisfy 0 < base <= max".to_string(),
            ));
        }
        Ok(())
    }
}
