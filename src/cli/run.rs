//! Run command implementation

use crate::config::{Config, ExecutionMode};
use crate::engine::Engine;
use crate::feed::{BinanceFeed, PriceFeed, PriceSampler};
use crate::gateway::{OrderGateway, PaperGateway};
use crate::market::{FixedCycleSource, MarketRegistry, MarketSource};
use crate::position::{PositionTracker, TrackerConfig};
use chrono::Duration as ChronoDuration;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let gateway: Arc<dyn OrderGateway> = match config.execution.mode {
            ExecutionMode::Paper => {
                tracing::info!(
                    balance = %config.execution.initial_balance,
                    "Paper trading mode, no real orders will be placed"
                );
                Arc::new(PaperGateway::new(config.execution.slippage_estimate))
            }
            ExecutionMode::Live => {
                anyhow::bail!(
                    "live execution requires an external venue gateway; use mode = \"paper\""
                );
            }
        };

        let assets: Vec<String> = config
            .feed
            .assets
            .iter()
            .map(|a| a.to_uppercase())
            .collect();

        let feed = BinanceFeed::new(&config.feed);
        let ticks = feed.subscribe().await?;
        let sampler = PriceSampler::new(
            ticks,
            &assets,
            ChronoDuration::seconds(config.strategy.lookback_secs as i64),
            config.strategy.min_samples,
            ChronoDuration::seconds(config.feed.staleness_secs as i64),
        );

        let registry = MarketRegistry::new();
        let source: Arc<dyn MarketSource> =
            Arc::new(FixedCycleSource::new(assets, config.market.cycle_secs));
        registry.refresh(source.as_ref()).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh_task = registry.spawn_refresh(
            source,
            Duration::from_secs(config.market.refresh_interval_secs),
            shutdown_rx.clone(),
        );

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down after this tick");
                let _ = shutdown_tx.send(true);
            }
        });

        let tracker = PositionTracker::new(
            gateway,
            TrackerConfig::from_config(&config.risk, &config.execution),
            config.execution.initial_balance,
        );

        let mut engine = Engine::new(&config, sampler, registry, tracker);
        engine.run(shutdown_rx).await?;

        refresh_task.abort();
        Ok(())
    }
}
