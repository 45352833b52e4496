//! Binance WebSocket price feed implementation
//!
//! One combined-stream connection covers every tracked asset:
//! `/stream?streams=btcusdt@trade/ethusdt@trade`

use super::{PriceFeed, PriceTick, StreamClient, StreamConfig, StreamEvent};
use crate::config::FeedConfig;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Binance WebSocket base URL
const BINANCE_WS_URL: &str = "wss://stream.binance.com:9443";

/// Envelope for combined-stream messages
#[derive(Debug, Deserialize)]
struct CombinedFrame {
    #[allow(dead_code)]
    stream: String,
    data: TradeEvent,
}

/// Binance trade event
#[derive(Debug, Deserialize)]
struct TradeEvent {
    /// Event type
    #[serde(rename = "e")]
    event_type: String,
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Binance combined trade-stream feed for the configured assets
#[derive(Clone)]
pub struct BinanceFeed {
    /// Symbol -> asset, e.g. "BTCUSDT" -> "BTC"
    assets_by_symbol: HashMap<String, String>,
    stream_config: StreamConfig,
}

impl BinanceFeed {
    /// Create a feed for the assets in the feed configuration
    pub fn new(config: &FeedConfig) -> Self {
        let assets_by_symbol: HashMap<String, String> = config
            .assets
            .iter()
            .map(|asset| (Self::symbol_for(asset), asset.to_uppercase()))
            .collect();

        let streams: Vec<String> = config
            .assets
            .iter()
            .map(|asset| format!("{}@trade", Self::symbol_for(asset).to_lowercase()))
            .collect();
        let url = format!("{}/stream?streams={}", BINANCE_WS_URL, streams.join("/"));

        let stream_config = StreamConfig::new(url)
            .max_reconnects(config.max_reconnect_attempts)
            .initial_delay(Duration::from_secs(config.reconnect_initial_delay_secs))
            .max_delay(Duration::from_secs(config.reconnect_max_delay_secs))
            .ping_interval(Duration::from_secs(config.ping_interval_secs));

        Self {
            assets_by_symbol,
            stream_config,
        }
    }

    /// Binance spot symbol for a tracked asset
    fn symbol_for(asset: &str) -> String {
        format!("{}USDT", asset.to_uppercase())
    }

    /// Parse a combined-stream frame into a price tick
    fn parse_frame(&self, text: &str) -> Option<PriceTick> {
        let frame: CombinedFrame = serde_json::from_str(text).ok()?;
        let trade = frame.data;

        if trade.event_type != "trade" {
            return None;
        }

        let asset = self.assets_by_symbol.get(&trade.symbol)?.clone();
        let price = Decimal::from_str(&trade.price).ok()?;
        let timestamp = Utc.timestamp_millis_opt(trade.trade_time).single()?;

        Some(PriceTick {
            asset,
            price,
            timestamp,
            received_at: Utc::now(),
        })
    }

    /// Forward parsed ticks until either side hangs up
    async fn run_message_loop(
        feed: BinanceFeed,
        mut stream_rx: mpsc::Receiver<StreamEvent>,
        tick_tx: mpsc::Sender<PriceTick>,
    ) {
        while let Some(event) = stream_rx.recv().await {
            match event {
                StreamEvent::Frame(text) => {
                    if let Some(tick) = feed.parse_frame(&text) {
                        if tick_tx.send(tick).await.is_err() {
                            tracing::debug!("Tick receiver dropped, stopping feed");
                            break;
                        }
                    }
                }
                StreamEvent::Connected => {
                    tracing::info!("Binance feed connected");
                }
                StreamEvent::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Binance feed reconnecting...");
                }
                StreamEvent::Exhausted => {
                    tracing::error!("Binance feed gave up reconnecting");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl PriceFeed for BinanceFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<PriceTick>> {
        let (tick_tx, tick_rx) = mpsc::channel(1024);

        tracing::info!(
            symbols = ?self.assets_by_symbol.keys().collect::<Vec<_>>(),
            "Subscribing to Binance combined trade streams"
        );

        let client = StreamClient::new(self.stream_config.clone());
        let stream_rx = client.connect();

        let feed = self.clone();
        tokio::spawn(async move {
            Self::run_message_loop(feed, stream_rx, tick_tx).await;
        });

        Ok(tick_rx)
    }
}
