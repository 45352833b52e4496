//! Z-score signal detection

use super::{ExitTrigger, Side, Signal, SignalKind};
use crate::window::WindowStats;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Detects entry and exit signals from Z-score threshold crossings
///
/// One detector per asset; thresholds are resolved from configuration
/// at startup and never change at runtime. Assets are evaluated
/// independently of each other.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    entry_threshold: Decimal,
    exit_threshold: Decimal,
}

impl ZScoreDetector {
    /// Create a detector with the given entry/exit thresholds
    pub fn new(entry_threshold: Decimal, exit_threshold: Decimal) -> Self {
        Self {
            entry_threshold,
            exit_threshold,
        }
    }

    /// Compute the Z-score of a price against window statistics
    ///
    /// Returns None when the standard deviation is zero; a flat window
    /// carries no information about deviation.
    pub fn z_score(stats: &WindowStats, price: Decimal) -> Option<Decimal> {
        if stats.std_dev <= Decimal::ZERO {
            return None;
        }
        Some((price - stats.mean) / stats.std_dev)
    }

    /// Evaluate one asset for this tick
    ///
    /// Pure with respect to its inputs: the same window statistics and
    /// price always yield the same signal.
    pub fn evaluate(
        &self,
        asset: &str,
        price: Decimal,
        stats: Option<&WindowStats>,
        open_side: Option<Side>,
        now: DateTime<Utc>,
    ) -> Signal {
        let Some(stats) = stats else {
            return Signal::none(asset, None, price, now);
        };

        let Some(z) = Self::z_score(stats, price) else {
            return Signal::none(asset, None, price, now);
        };

        let kind = match open_side {
            // Flat: enter against a large deviation
            None => {
                if z >= self.entry_threshold {
                    SignalKind::EnterNo
                } else if z <= -self.entry_threshold {
                    SignalKind::EnterYes
                } else {
                    SignalKind::None
                }
            }
            // Open: exit when the deviation has reverted or flipped
            Some(side) => {
                if z.abs() <= self.exit_threshold {
                    SignalKind::Exit(ExitTrigger::MeanReverted)
                } else if self.over_corrected(side, z) {
                    SignalKind::Exit(ExitTrigger::OverCorrected)
                } else {
                    SignalKind::None
                }
            }
        };

        Signal::new(asset, kind, Some(z), price, now)
    }

    /// Z flipped past the exit threshold on the opposite side of entry.
    /// A No position entered on a spike (positive z); a Yes position on
    /// a dip (negative z).
    fn over_corrected(&self, side: Side, z: Decimal) -> bool {
        match side {
            Side::No => z <= -self.exit_threshold,
            Side::Yes => z >= self.exit_threshold,
        }
    }
}
