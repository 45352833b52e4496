//! Market metadata module
//!
//! Read-only {asset, expiry} metadata for short-lived binary markets,
//! refreshed periodically from a discovery collaborator

mod cycle;
mod registry;

pub use cycle::FixedCycleSource;
pub use registry::MarketRegistry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short-lived binary market window for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Asset the market settles on
    pub asset: String,
    /// Venue market identifier
    pub market_id: String,
    /// Window open time
    pub opens_at: DateTime<Utc>,
    /// Settlement time
    pub expiry: DateTime<Utc>,
}

impl MarketInfo {
    /// Seconds remaining until settlement (0 when expired)
    pub fn seconds_to_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expiry - now).num_seconds().max(0)
    }

    /// Whether the market has not yet settled
    pub fn is_tradeable(&self, now: DateTime<Utc>) -> bool {
        self.expiry > now
    }
}

/// Trait for market metadata providers
///
/// Discovery itself (venue APIs, polling, retries) lives behind this
/// seam; the engine only ever reads the snapshots it produces.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Fetch the current market window for each tracked asset
    async fn fetch(&self) -> anyhow::Result<Vec<MarketInfo>>;
}
