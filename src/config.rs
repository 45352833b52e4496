//! Configuration types for poly-revert

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Configuration errors (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Exit threshold must be strictly below the entry threshold
    #[error("exit threshold {exit} must be below entry threshold {entry} (asset: {asset})")]
    ThresholdOrder {
        asset: String,
        entry: Decimal,
        exit: Decimal,
    },
    /// A numeric parameter is out of range
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
    /// No tradeable assets configured
    #[error("at least one trade asset must be configured")]
    NoAssets,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub engine: EngineConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub market: MarketConfig,
    pub execution: ExecutionConfig,
    pub telemetry: TelemetryConfig,
}

/// Price feed configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Exchange name (only "binance" is supported)
    pub exchange: String,
    /// Assets to track (e.g. ["BTC", "ETH"]); mapped to <asset>USDT streams
    pub assets: Vec<String>,
    /// Exclude an asset from evaluation when no sample arrived within this bound
    pub staleness_secs: u64,
    /// Initial reconnect delay for the WebSocket stream
    pub reconnect_initial_delay_secs: u64,
    /// Maximum reconnect delay (exponential backoff cap)
    pub reconnect_max_delay_secs: u64,
    /// Maximum reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Ping interval for the WebSocket keepalive
    pub ping_interval_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            exchange: "binance".to_string(),
            assets: vec!["BTC".to_string(), "ETH".to_string()],
            staleness_secs: 30,
            reconnect_initial_delay_secs: 1,
            reconnect_max_delay_secs: 60,
            max_reconnect_attempts: 0,
            ping_interval_secs: 30,
        }
    }
}

/// Evaluation loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between evaluation ticks
    pub tick_interval_secs: u64,
    /// Seconds between status snapshots
    pub status_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            status_interval_secs: 30,
        }
    }
}

/// Z-score strategy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// |z| at or beyond which an entry signal fires
    pub entry_threshold: Decimal,
    /// |z| at or below which an open position exits (mean reverted)
    pub exit_threshold: Decimal,
    /// Rolling window duration in seconds
    pub lookback_secs: u64,
    /// Minimum samples before the window produces statistics (floor 2)
    pub min_samples: usize,
    /// Per-asset threshold overrides, resolved once at startup
    pub overrides: HashMap<String, ThresholdOverride>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            entry_threshold: dec!(2.5),
            exit_threshold: dec!(0.5),
            lookback_secs: 60,
            min_samples: 30,
            overrides: HashMap::new(),
        }
    }
}

/// Optional per-asset threshold override
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThresholdOverride {
    pub entry_threshold: Option<Decimal>,
    pub exit_threshold: Option<Decimal>,
}

impl StrategyConfig {
    /// Resolve the (entry, exit) thresholds for an asset
    pub fn thresholds_for(&self, asset: &str) -> (Decimal, Decimal) {
        let ov = self.overrides.get(asset);
        let entry = ov
            .and_then(|o| o.entry_threshold)
            .unwrap_or(self.entry_threshold);
        let exit = ov
            .and_then(|o| o.exit_threshold)
            .unwrap_or(self.exit_threshold);
        (entry, exit)
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Quote-currency amount committed per trade
    pub bet_amount: Decimal,
    /// Maximum concurrent open positions
    pub max_positions: usize,
    /// Seconds after a trade before the same asset may be re-entered
    pub cooldown_secs: u64,
    /// Force-close positions this many seconds before market expiry
    pub min_close_buffer_secs: u64,
    /// Force-close positions held longer than this
    pub max_hold_secs: u64,
    /// Refuse new entries after this many consecutive losing trades
    pub max_consecutive_losses: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            bet_amount: dec!(10),
            max_positions: 5,
            cooldown_secs: 60,
            min_close_buffer_secs: 120,
            max_hold_secs: 300,
            max_consecutive_losses: 5,
        }
    }
}

/// Market window configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Length of each market window in seconds
    pub cycle_secs: u64,
    /// Do not enter a market with less than this long to expiry
    pub min_time_to_expiry_secs: u64,
    /// Do not enter a market with more than this long to expiry
    pub max_time_to_expiry_secs: u64,
    /// Seconds between market metadata refreshes
    pub refresh_interval_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            cycle_secs: 900,
            min_time_to_expiry_secs: 300,
            max_time_to_expiry_secs: 840,
            refresh_interval_secs: 30,
        }
    }
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    /// Starting balance for paper trading
    pub initial_balance: Decimal,
    /// Deterministic slippage applied to simulated fills
    pub slippage_estimate: Decimal,
    /// Gateway calls exceeding this are treated as rejected
    pub gateway_timeout_secs: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Paper,
            initial_balance: dec!(100),
            slippage_estimate: dec!(0.001),
            gateway_timeout_secs: 5,
        }
    }
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration; invalid thresholds are fatal at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.assets.is_empty() {
            return Err(ConfigError::NoAssets);
        }

        if self.risk.bet_amount <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                name: "risk.bet_amount",
                reason: "must be positive".to_string(),
            });
        }

        if self.risk.max_positions == 0 {
            return Err(ConfigError::InvalidValue {
                name: "risk.max_positions",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.strategy.lookback_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "strategy.lookback_secs",
                reason: "must be positive".to_string(),
            });
        }

        if self.engine.tick_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "engine.tick_interval_secs",
                reason: "must be positive".to_string(),
            });
        }

        if self.execution.initial_balance <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                name: "execution.initial_balance",
                reason: "must be positive".to_string(),
            });
        }

        // Thresholds must be sane for every asset after overrides resolve
        for asset in &self.feed.assets {
            let (entry, exit) = self.strategy.thresholds_for(asset);
            if entry <= Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    name: "strategy.entry_threshold",
                    reason: format!("must be positive (asset: {})", asset),
                });
            }
            if exit < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    name: "strategy.exit_threshold",
                    reason: format!("must be non-negative (asset: {})", asset),
                });
            }
            if exit >= entry {
                return Err(ConfigError::ThresholdOrder {
                    asset: asset.clone(),
                    entry,
                    exit,
                });
            }
        }

        Ok(())
    }
}
