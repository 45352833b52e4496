//! Rolling price window module
//!
//! Fixed-duration time-windowed buffer of price samples per asset,
//! producing mean / standard deviation statistics on demand

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use thiserror::Error;

/// Hard floor on samples; sample standard deviation is undefined below 2
const MIN_SAMPLES_FLOOR: usize = 2;

/// The window holds too few samples to compute statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient samples: {count} < {required}")]
pub struct InsufficientWindow {
    pub count: usize,
    pub required: usize,
}

/// Statistics over the current window contents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Arithmetic mean of sample prices
    pub mean: Decimal,
    /// Sample standard deviation (n-1 divisor)
    pub std_dev: Decimal,
    /// Number of samples in the window
    pub count: usize,
}

/// Rolling window of price observations for one asset
///
/// Samples older than the lookback duration are evicted on insert,
/// so the buffer always satisfies `timestamp >= newest - lookback`
/// and stays time-ordered.
pub struct RollingWindow {
    lookback: Duration,
    min_samples: usize,
    samples: VecDeque<(DateTime<Utc>, Decimal)>,
}

impl RollingWindow {
    /// Create a window with the given lookback and minimum sample count
    pub fn new(lookback: Duration, min_samples: usize) -> Self {
        Self {
            lookback,
            min_samples: min_samples.max(MIN_SAMPLES_FLOOR),
            samples: VecDeque::new(),
        }
    }

    /// Append a sample and evict entries that fell out of the lookback
    pub fn insert(&mut self, timestamp: DateTime<Utc>, price: Decimal) {
        self.samples.push_back((timestamp, price));

        let cutoff = timestamp - self.lookback;
        while let Some((ts, _)) = self.samples.front() {
            if *ts < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample, if any
    pub fn latest(&self) -> Option<(DateTime<Utc>, Decimal)> {
        self.samples.back().copied()
    }

    /// Compute mean and sample standard deviation over the window
    ///
    /// Signals insufficiency instead of returning 0 or NaN when fewer
    /// than the configured minimum samples are present.
    pub fn stats(&self) -> Result<WindowStats, InsufficientWindow> {
        let count = self.samples.len();
        if count < self.min_samples {
            return Err(InsufficientWindow {
                count,
                required: self.min_samples,
            });
        }

        let prices: Vec<f64> = self
            .samples
            .iter()
            .map(|(_, p)| f64::try_from(*p).unwrap_or(0.0))
            .collect();

        let n = prices.len() as f64;
        let mean = prices.iter().sum::<f64>() / n;
        let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        Ok(WindowStats {
            mean: Decimal::try_from(mean).unwrap_or_default(),
            std_dev: Decimal::try_from(std_dev).unwrap_or_default(),
            count,
        })
    }
}
