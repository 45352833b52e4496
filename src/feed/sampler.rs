//! Price sampler
//!
//! Drains the feed channel once per tick and applies the queued ticks
//! to the per-asset rolling windows. Ticks arrive asynchronously; the
//! evaluation loop is the only writer, so every read within a tick
//! sees one consistent last-known price per asset.

use super::PriceTick;
use crate::window::RollingWindow;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Maintains the latest price and rolling window per tracked asset
pub struct PriceSampler {
    rx: mpsc::Receiver<PriceTick>,
    windows: HashMap<String, RollingWindow>,
    last_seen: HashMap<String, DateTime<Utc>>,
    staleness: Duration,
}

impl PriceSampler {
    /// Create a sampler for the given assets
    pub fn new(
        rx: mpsc::Receiver<PriceTick>,
        assets: &[String],
        lookback: Duration,
        min_samples: usize,
        staleness: Duration,
    ) -> Self {
        let windows = assets
            .iter()
            .map(|asset| {
                (
                    asset.to_uppercase(),
                    RollingWindow::new(lookback, min_samples),
                )
            })
            .collect();

        Self {
            rx,
            windows,
            last_seen: HashMap::new(),
            staleness,
        }
    }

    /// Apply every queued tick; returns how many were applied
    ///
    /// Ticks for untracked assets are dropped. Never blocks: only the
    /// ticks already buffered in the channel are consumed.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(tick) = self.rx.try_recv() {
            let Some(window) = self.windows.get_mut(&tick.asset) else {
                tracing::debug!(asset = %tick.asset, "Dropping tick for untracked asset");
                continue;
            };
            window.insert(tick.timestamp, tick.price);
            self.last_seen.insert(tick.asset, tick.received_at);
            applied += 1;
        }
        applied
    }

    /// Rolling window for an asset
    pub fn window(&self, asset: &str) -> Option<&RollingWindow> {
        self.windows.get(asset)
    }

    /// Last-known price for an asset
    pub fn last_price(&self, asset: &str) -> Option<Decimal> {
        self.windows
            .get(asset)
            .and_then(|w| w.latest())
            .map(|(_, price)| price)
    }

    /// When the asset last received a tick
    pub fn last_seen(&self, asset: &str) -> Option<DateTime<Utc>> {
        self.last_seen.get(asset).copied()
    }

    /// Whether the asset is stale: no tick within the staleness bound
    ///
    /// An asset that never received a tick is stale. Stale assets are
    /// excluded from signal evaluation until fresh data arrives.
    pub fn is_stale(&self, asset: &str, now: DateTime<Utc>) -> bool {
        match self.last_seen.get(asset) {
            Some(seen) => now - *seen > self.staleness,
            None => true,
        }
    }

    /// Last-known price per asset, for forced closes and status logs
    pub fn price_snapshot(&self) -> HashMap<String, Decimal> {
        self.windows
            .iter()
            .filter_map(|(asset, window)| {
                window.latest().map(|(_, price)| (asset.clone(), price))
            })
            .collect()
    }
}
