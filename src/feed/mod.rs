//! Price feed module
//!
//! Streams real-time trade prices from Binance and maintains the
//! per-asset rolling windows the engine evaluates against

mod binance;
mod sampler;
mod stream;
mod types;

pub use binance::BinanceFeed;
pub use sampler::PriceSampler;
pub use stream::{StreamClient, StreamConfig, StreamEvent};
pub use types::PriceTick;

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Trait for price feed implementations
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Subscribe to price updates
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<PriceTick>>;
}
