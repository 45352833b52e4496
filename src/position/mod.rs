//! Position tracking module
//!
//! Owns open positions, per-asset cooldowns, the trading balance,
//! and session statistics

mod stats;
mod tracker;

pub use stats::SessionStats;
pub use tracker::{EntryReject, PositionTracker, TrackerConfig};

use crate::signal::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An open position
///
/// Owned exclusively by the tracker for its lifetime; a new trade is
/// always a new position with a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Position identifier
    pub id: Uuid,
    /// Asset being traded
    pub asset: String,
    /// Trade side
    pub side: Side,
    /// Entry fill price
    pub entry_price: Decimal,
    /// Position size
    pub size: Decimal,
    /// Z-score at entry
    pub entry_z: Decimal,
    /// Entry timestamp
    pub opened_at: DateTime<Utc>,
    /// Settlement time of the market the position is in
    pub market_expiry: DateTime<Utc>,
}

impl Position {
    /// Seconds the position has been held
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.opened_at).num_seconds()
    }

    /// Seconds until the market settles (0 when past expiry)
    pub fn time_to_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.market_expiry - now).num_seconds().max(0)
    }

    /// Quote-currency cost basis
    pub fn cost(&self) -> Decimal {
        self.entry_price * self.size
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Z-score returned inside the exit threshold
    MeanReversion,
    /// Z-score flipped past the exit threshold against the entry
    OverCorrection,
    /// Market expiry closer than the close buffer
    ExpiryBuffer,
    /// Held longer than the maximum hold duration
    MaxHold,
    /// Engine shutting down
    Shutdown,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::MeanReversion => write!(f, "mean_reversion"),
            ExitReason::OverCorrection => write!(f, "over_correction"),
            ExitReason::ExpiryBuffer => write!(f, "expiry_buffer"),
            ExitReason::MaxHold => write!(f, "max_hold"),
            ExitReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// A closed position; immutable history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    /// The position as it was when open
    pub position: Position,
    /// Exit fill price
    pub exit_price: Decimal,
    /// Close timestamp
    pub closed_at: DateTime<Utc>,
    /// Realized P&L: (exit - entry) * size * direction sign
    pub pnl: Decimal,
    /// Why the position was closed
    pub reason: ExitReason,
}
