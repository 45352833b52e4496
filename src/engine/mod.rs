//! Evaluation loop
//!
//! One sequential tick at a time: drain the sampler, force-close due
//! positions, then evaluate each asset independently. Price ingestion
//! happens concurrently; everything that mutates positions or balance
//! runs inside this loop.

use crate::config::Config;
use crate::feed::PriceSampler;
use crate::market::MarketRegistry;
use crate::position::{ExitReason, PositionTracker};
use crate::signal::{ExitTrigger, SignalKind, ZScoreDetector};
use crate::telemetry::{self, GaugeMetric};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::watch;

/// Periodic observability snapshot
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub balance: Decimal,
    pub realized_pnl: Decimal,
    pub trades: u64,
    pub wins: u64,
    pub losses: u64,
    pub open_positions: usize,
    /// Last computed Z-score per asset, where one was computable
    pub per_asset_z: HashMap<String, Decimal>,
}

/// The trading engine: owns the sampler, tracker, and detectors
pub struct Engine {
    assets: Vec<String>,
    detectors: HashMap<String, ZScoreDetector>,
    sampler: PriceSampler,
    registry: MarketRegistry,
    tracker: PositionTracker,
    tick_interval: std::time::Duration,
    status_interval: Duration,
    min_time_to_expiry: i64,
    max_time_to_expiry: i64,
}

impl Engine {
    /// Assemble an engine from configuration and its collaborators
    ///
    /// Per-asset thresholds are resolved here, once; the detector map
    /// never changes at runtime.
    pub fn new(
        config: &Config,
        sampler: PriceSampler,
        registry: MarketRegistry,
        tracker: PositionTracker,
    ) -> Self {
        let assets: Vec<String> = config
            .feed
            .assets
            .iter()
            .map(|a| a.to_uppercase())
            .collect();

        let detectors = assets
            .iter()
            .map(|asset| {
                let (entry, exit) = config.strategy.thresholds_for(asset);
                (asset.clone(), ZScoreDetector::new(entry, exit))
            })
            .collect();

        Self {
            assets,
            detectors,
            sampler,
            registry,
            tracker,
            tick_interval: std::time::Duration::from_secs(config.engine.tick_interval_secs),
            status_interval: Duration::seconds(config.engine.status_interval_secs as i64),
            min_time_to_expiry: config.market.min_time_to_expiry_secs as i64,
            max_time_to_expiry: config.market.max_time_to_expiry_secs as i64,
        }
    }

    /// The tracker, for inspection
    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    /// Run the loop until shutdown
    ///
    /// Shutdown is cooperative: the current tick finishes, open
    /// positions are closed through the gateway, and a session summary
    /// is logged.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!(
            assets = ?self.assets,
            tick_interval_secs = self.tick_interval.as_secs(),
            "Engine starting"
        );

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_status = Utc::now();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Utc::now();
                    self.tick(now).await;

                    if now - last_status >= self.status_interval {
                        self.log_status();
                        last_status = now;
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender also means the session is over
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Shutdown requested, finishing up");
                        break;
                    }
                }
            }
        }

        let prices = self.sampler.price_snapshot();
        self.tracker.close_all(&prices, Utc::now()).await;
        self.tracker.stats().log_summary(self.tracker.balance());
        tracing::info!("Engine stopped");
        Ok(())
    }

    /// Run one evaluation cycle
    ///
    /// Forced closes run first, independent of signals. Assets are
    /// evaluated strictly one at a time; a failure on one asset never
    /// aborts the others.
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        let applied = self.sampler.drain();
        tracing::trace!(ticks = applied, "Sampler drained");

        let prices = self.sampler.price_snapshot();
        let forced = self.tracker.force_close_due(&prices, now).await;
        if forced > 0 {
            tracing::info!(count = forced, "Forced closes this tick");
        }

        let assets = self.assets.clone();
        for asset in &assets {
            self.evaluate_asset(asset, now).await;
        }
    }

    /// Evaluate one asset; all per-asset errors stop here
    async fn evaluate_asset(&mut self, asset: &str, now: DateTime<Utc>) {
        if self.sampler.is_stale(asset, now) {
            tracing::trace!(asset, "Feed stale, asset excluded from evaluation");
            return;
        }
        let Some(price) = self.sampler.last_price(asset) else {
            return;
        };
        let Some(market) = self.registry.get(asset).await else {
            tracing::trace!(asset, "No market metadata yet");
            return;
        };
        if !market.is_tradeable(now) {
            return;
        }

        let stats = match self.sampler.window(asset).map(|w| w.stats()) {
            Some(Ok(stats)) => Some(stats),
            Some(Err(e)) => {
                tracing::trace!(asset, %e, "Window not ready");
                None
            }
            None => None,
        };

        let Some(detector) = self.detectors.get(asset) else {
            return;
        };
        let open_side = self.tracker.position_for_asset(asset).map(|p| p.side);
        let signal = detector.evaluate(asset, price, stats.as_ref(), open_side, now);

        match signal.kind {
            SignalKind::None => {}
            SignalKind::EnterYes | SignalKind::EnterNo => {
                let tte = market.seconds_to_expiry(now);
                if tte < self.min_time_to_expiry || tte > self.max_time_to_expiry {
                    tracing::debug!(
                        asset,
                        seconds_to_expiry = tte,
                        "Entry suppressed outside tradeable expiry window"
                    );
                    return;
                }

                tracing::info!(
                    asset,
                    kind = ?signal.kind,
                    z = %signal.z_score.unwrap_or_default(),
                    price = %price,
                    "Entry signal"
                );
                match self.tracker.try_open(&signal, market.expiry, now).await {
                    Ok(_) => {}
                    Err(e) => tracing::warn!(asset, error = %e, "Entry not taken"),
                }
            }
            SignalKind::Exit(trigger) => {
                let reason = match trigger {
                    ExitTrigger::MeanReverted => ExitReason::MeanReversion,
                    ExitTrigger::OverCorrected => ExitReason::OverCorrection,
                };
                tracing::info!(
                    asset,
                    z = %signal.z_score.unwrap_or_default(),
                    reason = %reason,
                    "Exit signal"
                );
                if let Err(e) = self.tracker.try_close(asset, price, reason, now).await {
                    tracing::warn!(asset, error = %e, "Exit failed, will retry next tick");
                }
            }
        }
    }

    /// Z-score an asset would evaluate at right now
    fn current_z(&self, asset: &str) -> Option<Decimal> {
        let window = self.sampler.window(asset)?;
        let stats = window.stats().ok()?;
        let price = self.sampler.last_price(asset)?;
        ZScoreDetector::z_score(&stats, price)
    }

    /// Build the observability snapshot
    pub fn status(&self) -> EngineStatus {
        let stats = self.tracker.stats();
        let per_asset_z = self
            .assets
            .iter()
            .filter_map(|asset| self.current_z(asset).map(|z| (asset.clone(), z)))
            .collect();

        EngineStatus {
            balance: self.tracker.balance(),
            realized_pnl: stats.total_pnl,
            trades: stats.total_trades,
            wins: stats.winning_trades,
            losses: stats.losing_trades,
            open_positions: self.tracker.open_count(),
            per_asset_z,
        }
    }

    /// Log the snapshot and export gauges
    fn log_status(&self) {
        let status = self.status();

        let mut lines: Vec<String> = Vec::new();
        for asset in &self.assets {
            match (self.sampler.last_price(asset), status.per_asset_z.get(asset)) {
                (Some(price), Some(z)) => lines.push(format!(
                    "{}: {} (z={:+.2})",
                    asset,
                    price,
                    decimal_to_f64(*z)
                )),
                (Some(price), None) => lines.push(format!("{}: {} (warming up)", asset, price)),
                _ => lines.push(format!("{}: no data", asset)),
            }
        }

        tracing::info!(
            balance = %status.balance,
            pnl = %status.realized_pnl,
            trades = status.trades,
            wins = status.wins,
            losses = status.losses,
            open = status.open_positions,
            prices = %lines.join(" | "),
            "Status"
        );

        telemetry::set_gauge(GaugeMetric::Balance, decimal_to_f64(status.balance));
        telemetry::set_gauge(GaugeMetric::RealizedPnl, decimal_to_f64(status.realized_pnl));
        telemetry::set_gauge(GaugeMetric::OpenPositions, status.open_positions as f64);
        telemetry::set_gauge(GaugeMetric::TradesTotal, status.trades as f64);
        telemetry::set_gauge(GaugeMetric::WinsTotal, status.wins as f64);
        telemetry::set_gauge(GaugeMetric::LossesTotal, status.losses as f64);
        for (asset, z) in &status.per_asset_z {
            telemetry::set_asset_zscore(asset, decimal_to_f64(*z));
        }
    }
}

fn decimal_to_f64(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::feed::PriceTick;
    use crate::gateway::PaperGateway;
    use crate::market::FixedCycleSource;
    use crate::position::TrackerConfig;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Harness {
        tx: mpsc::Sender<PriceTick>,
        engine: Engine,
    }

    async fn harness(config: Config) -> Harness {
        let (tx, rx) = mpsc::channel(1024);
        let sampler = PriceSampler::new(
            rx,
            &config.feed.assets,
            Duration::seconds(config.strategy.lookback_secs as i64),
            config.strategy.min_samples,
            Duration::seconds(config.feed.staleness_secs as i64),
        );

        let registry = MarketRegistry::new();
        let source = FixedCycleSource::new(config.feed.assets.clone(), config.market.cycle_secs);
        registry.refresh(&source).await.unwrap();

        let gateway = Arc::new(PaperGateway::new(dec!(0)));
        let tracker = PositionTracker::new(
            gateway,
            TrackerConfig::from_config(&config.risk, &config.execution),
            config.execution.initial_balance,
        );

        let engine = Engine::new(&config, sampler, registry, tracker);
        Harness { tx, engine }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.feed.assets = vec!["BTC".to_string()];
        config.strategy.min_samples = 2;
        // Wide expiry window so cycle phase does not gate entries
        config.market.min_time_to_expiry_secs = 0;
        config.market.max_time_to_expiry_secs = 900;
        config
    }

    async fn send_series(h: &Harness, base: DateTime<Utc>, prices: &[Decimal]) {
        for (i, price) in prices.iter().enumerate() {
            let at = base + Duration::seconds(i as i64);
            h.tx.send(PriceTick {
                    asset: "BTC".to_string(),
                    price: *price,
                    timestamp: at,
                    received_at: Utc::now(),
                })
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_no_entry_without_deviation() {
        let mut h = harness(test_config()).await;
        let base = Utc::now() - Duration::seconds(10);

        send_series(&h, base, &[dec!(100), dec!(100.1), dec!(99.9), dec!(100)]).await;
        h.engine.tick(Utc::now()).await;

        assert_eq!(h.engine.tracker().open_count(), 0);
    }

    #[tokio::test]
    async fn test_spike_opens_no_position() {
        let mut h = harness(test_config()).await;
        let base = Utc::now() - Duration::seconds(10);

        // Tight cluster then a violent spike: z >> 2.5
        send_series(
            &h,
            base,
            &[
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(110),
            ],
        )
        .await;
        h.engine.tick(Utc::now()).await;

        assert_eq!(h.engine.tracker().open_count(), 1);
        let pos = h.engine.tracker().position_for_asset("BTC").unwrap();
        assert_eq!(pos.side, crate::signal::Side::No);
    }

    #[tokio::test]
    async fn test_stale_asset_skipped() {
        let mut config = test_config();
        config.feed.staleness_secs = 5;
        let mut h = harness(config).await;
        let base = Utc::now() - Duration::seconds(10);

        send_series(
            &h,
            base,
            &[
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(110),
            ],
        )
        .await;
        // First drain happens now, but evaluation runs "later"
        h.engine.sampler.drain();
        let later = Utc::now() + Duration::seconds(60);
        h.engine.evaluate_asset("BTC", later).await;

        // Stale feed: no evaluation, no entry
        assert_eq!(h.engine.tracker().open_count(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_window_no_signal() {
        let mut config = test_config();
        config.strategy.min_samples = 10;
        let mut h = harness(config).await;
        let base = Utc::now() - Duration::seconds(10);

        send_series(&h, base, &[dec!(100), dec!(110)]).await;
        h.engine.tick(Utc::now()).await;

        assert_eq!(h.engine.tracker().open_count(), 0);
    }

    #[tokio::test]
    async fn test_expiry_window_gates_entry() {
        let mut config = test_config();
        // Impossible window: always suppressed
        config.market.min_time_to_expiry_secs = 901;
        config.market.max_time_to_expiry_secs = 902;
        let mut h = harness(config).await;
        let base = Utc::now() - Duration::seconds(10);

        send_series(
            &h,
            base,
            &[
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(100),
                dec!(110),
            ],
        )
        .await;
        h.engine.tick(Utc::now()).await;

        assert_eq!(h.engine.tracker().open_count(), 0);
    }

    #[tokio::test]
    async fn test_forced_close_runs_before_signals() {
        let mut h = harness(test_config()).await;
        let now = Utc::now();

        // Open directly against a market expiring in 130s (buffer is 120s)
        let signal = crate::signal::Signal::new(
            "BTC",
            crate::signal::SignalKind::EnterNo,
            Some(dec!(3)),
            dec!(100),
            now,
        );
        h.engine
            .tracker
            .try_open(&signal, now + Duration::seconds(130), now)
            .await
            .unwrap();
        assert_eq!(h.engine.tracker().open_count(), 1);

        // Keep the feed fresh so the tick has a price snapshot
        send_series(&h, now, &[dec!(100)]).await;

        // 10s later the position crosses the close buffer; the tick
        // force-closes it regardless of Z-score
        h.engine.tick(now + Duration::seconds(10)).await;
        assert_eq!(h.engine.tracker().open_count(), 0);
        assert_eq!(
            h.engine.tracker().closed_positions()[0].reason,
            ExitReason::ExpiryBuffer
        );
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let mut h = harness(test_config()).await;
        let base = Utc::now() - Duration::seconds(10);

        send_series(&h, base, &[dec!(100), dec!(101), dec!(99)]).await;
        h.engine.tick(Utc::now()).await;

        let status = h.engine.status();
        assert_eq!(status.balance, dec!(100));
        assert_eq!(status.trades, 0);
        assert!(status.per_asset_z.contains_key("BTC"));
    }
}
