//! Shared market metadata cache with periodic refresh

use super::{MarketInfo, MarketSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Caches the latest market window per asset
///
/// The engine reads from the cache every tick; a background task
/// refreshes it from the discovery source on an interval. The cache is
/// never mutated by the evaluation path.
#[derive(Clone, Default)]
pub struct MarketRegistry {
    markets: Arc<RwLock<HashMap<String, MarketInfo>>>,
}

impl MarketRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Current market window for an asset, if known and not settled out
    pub async fn get(&self, asset: &str) -> Option<MarketInfo> {
        let markets = self.markets.read().await;
        markets.get(asset).cloned()
    }

    /// Replace cached markets with a fresh snapshot
    pub async fn update(&self, snapshot: Vec<MarketInfo>) {
        let mut markets = self.markets.write().await;
        markets.clear();
        for market in snapshot {
            markets.insert(market.asset.clone(), market);
        }
    }

    /// Number of cached markets
    pub async fn len(&self) -> usize {
        self.markets.read().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.markets.read().await.is_empty()
    }

    /// Refresh once from the source
    pub async fn refresh(&self, source: &dyn MarketSource) -> anyhow::Result<()> {
        let snapshot = source.fetch().await?;
        self.update(snapshot).await;
        Ok(())
    }

    /// Spawn a background task that refreshes on an interval until shutdown
    pub fn spawn_refresh(
        &self,
        source: Arc<dyn MarketSource>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = registry.refresh(source.as_ref()).await {
                            tracing::warn!(error = %e, "Market refresh failed, keeping cached markets");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!("Market refresh task stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};

    struct StaticSource {
        markets: Vec<MarketInfo>,
    }

    #[async_trait]
    impl MarketSource for StaticSource {
        async fn fetch(&self) -> anyhow::Result<Vec<MarketInfo>> {
            Ok(self.markets.clone())
        }
    }

    fn market(asset: &str, expiry_in_secs: i64) -> MarketInfo {
        let now = Utc::now();
        MarketInfo {
            asset: asset.to_string(),
            market_id: format!("{}-test", asset.to_lowercase()),
            opens_at: now,
            expiry: now + ChronoDuration::seconds(expiry_in_secs),
        }
    }

    #[tokio::test]
    async fn test_registry_empty() {
        let registry = MarketRegistry::new();
        assert!(registry.is_empty().await);
        assert!(registry.get("BTC").await.is_none());
    }

    #[tokio::test]
    async fn test_registry_update_and_get() {
        let registry = MarketRegistry::new();
        registry
            .update(vec![market("BTC", 600), market("ETH", 600)])
            .await;

        assert_eq!(registry.len().await, 2);
        let btc = registry.get("BTC").await.unwrap();
        assert_eq!(btc.asset, "BTC");
    }

    #[tokio::test]
    async fn test_registry_update_replaces() {
        let registry = MarketRegistry::new();
        registry.update(vec![market("BTC", 600)]).await;
        registry.update(vec![market("ETH", 600)]).await;

        assert!(registry.get("BTC").await.is_none());
        assert!(registry.get("ETH").await.is_some());
    }

    #[tokio::test]
    async fn test_registry_refresh_from_source() {
        let registry = MarketRegistry::new();
        let source = StaticSource {
            markets: vec![market("BTC", 300)],
        };

        registry.refresh(&source).await.unwrap();
        assert_eq!(registry.len().await, 1);
    }
}
