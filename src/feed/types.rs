//! Price feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade price observation for a tracked asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTick {
    /// Tracked asset (e.g. "BTC")
    pub asset: String,
    /// Trade price
    pub price: Decimal,
    /// Exchange trade time
    pub timestamp: DateTime<Utc>,
    /// Local timestamp when the tick was received
    pub received_at: DateTime<Utc>,
}
