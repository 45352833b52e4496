//! Session trading statistics

use rust_decimal::Decimal;
use serde::Serialize;

/// Aggregate statistics over a trading session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Balance the session started with
    pub initial_balance: Decimal,
    /// Completed trades
    pub total_trades: u64,
    /// Trades with non-negative P&L
    pub winning_trades: u64,
    /// Trades with negative P&L
    pub losing_trades: u64,
    /// Realized P&L over the session
    pub total_pnl: Decimal,
    /// Losing trades in a row, reset on any win
    pub consecutive_losses: u32,
}

impl SessionStats {
    /// Create stats for a session starting with the given balance
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            total_pnl: Decimal::ZERO,
            consecutive_losses: 0,
        }
    }

    /// Record a completed trade
    pub fn record(&mut self, pnl: Decimal) {
        self.total_trades += 1;
        self.total_pnl += pnl;

        if pnl >= Decimal::ZERO {
            self.winning_trades += 1;
            self.consecutive_losses = 0;
        } else {
            self.losing_trades += 1;
            self.consecutive_losses += 1;
        }
    }

    /// Winning trades as a percentage of completed trades
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_trades) / Decimal::from(self.total_trades) * Decimal::from(100)
    }

    /// Average realized P&L per completed trade
    pub fn avg_pnl(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        self.total_pnl / Decimal::from(self.total_trades)
    }

    /// Log a session summary
    pub fn log_summary(&self, final_balance: Decimal) {
        tracing::info!(
            initial_balance = %self.initial_balance,
            final_balance = %final_balance,
            total_pnl = %self.total_pnl,
            trades = self.total_trades,
            wins = self.winning_trades,
            losses = self.losing_trades,
            win_rate_pct = %self.win_rate().round_dp(1),
            avg_pnl = %self.avg_pnl().round_dp(4),
            "Session summary"
        );
    }
}
