//! Fixed-cycle market windows
//!
//! Deterministic stand-in for venue market discovery: each asset gets
//! consecutive fixed-length windows aligned to the epoch, matching the
//! cadence of 15-minute up/down markets. Paper sessions run against
//! this source without any upstream service.

use super::{MarketInfo, MarketSource};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

/// Produces the current fixed-length market window per asset
pub struct FixedCycleSource {
    assets: Vec<String>,
    cycle_secs: i64,
}

impl FixedCycleSource {
    /// Create a source for the given assets and window length
    pub fn new(assets: Vec<String>, cycle_secs: u64) -> Self {
        Self {
            assets,
            cycle_secs: cycle_secs.max(1) as i64,
        }
    }

    /// The window containing `now` for one asset
    pub fn window_at(&self, asset: &str, now: DateTime<Utc>) -> MarketInfo {
        let start_ts = (now.timestamp() / self.cycle_secs) * self.cycle_secs;
        let end_ts = start_ts + self.cycle_secs;

        // timestamp_opt on an in-range unix timestamp is always single
        let opens_at = Utc
            .timestamp_opt(start_ts, 0)
            .single()
            .unwrap_or(now);
        let expiry = Utc
            .timestamp_opt(end_ts, 0)
            .single()
            .unwrap_or(now);

        MarketInfo {
            asset: asset.to_string(),
            market_id: format!("{}-updown-{}", asset.to_lowercase(), end_ts),
            opens_at,
            expiry,
        }
    }
}

#[async_trait]
impl MarketSource for FixedCycleSource {
    async fn fetch(&self) -> anyhow::Result<Vec<MarketInfo>> {
        let now = Utc::now();
        Ok(self
            .assets
            .iter()
            .map(|asset| self.window_at(asset, now))
            .collect())
    }
}
