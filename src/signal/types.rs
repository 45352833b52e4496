//! Signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trading side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy Yes tokens (bet on reversion up)
    Yes,
    /// Buy No tokens (bet on reversion down)
    No,
}

impl Side {
    /// Direction sign applied to P&L: Yes = +1, No = -1
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Yes => Decimal::ONE,
            Side::No => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// Why an open position should be exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitTrigger {
    /// |z| dropped back inside the exit threshold
    MeanReverted,
    /// z flipped past the exit threshold on the opposite side of entry
    OverCorrected,
}

/// Signal kind, one per asset per evaluation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// Price dipped hard; bet on reversion up
    EnterYes,
    /// Price spiked hard; bet on reversion down
    EnterNo,
    /// Close the open position for this asset
    Exit(ExitTrigger),
    /// Nothing to do
    None,
}

/// A trading signal
///
/// Transient: produced once per evaluation tick and consumed
/// immediately by the position tracker, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Asset the signal applies to
    pub asset: String,
    /// What the tracker should do
    pub kind: SignalKind,
    /// Z-score at evaluation time (absent when the window was insufficient)
    pub z_score: Option<Decimal>,
    /// Price the signal was evaluated at
    pub price: Decimal,
    /// Evaluation timestamp
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Create a signal
    pub fn new(
        asset: impl Into<String>,
        kind: SignalKind,
        z_score: Option<Decimal>,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            asset: asset.into(),
            kind,
            z_score,
            price,
            timestamp,
        }
    }

    /// A do-nothing signal for an asset
    pub fn none(
        asset: impl Into<String>,
        z_score: Option<Decimal>,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(asset, SignalKind::None, z_score, price, timestamp)
    }

    /// Entry side implied by the signal kind, if any
    pub fn entry_side(&self) -> Option<Side> {
        match self.kind {
            SignalKind::EnterYes => Some(Side::Yes),
            SignalKind::EnterNo => Some(Side::No),
            _ => None,
        }
    }
}
