//! Position tracker: entries, exits, forced closes

use super::{ClosedPosition, ExitReason, Position, SessionStats};
use crate::config::{ExecutionConfig, RiskConfig};
use crate::gateway::{CloseOrder, Execution, GatewayError, OpenOrder, OrderGateway};
use crate::signal::Signal;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Why an entry signal was not acted on
///
/// All rejections are no-ops: nothing is created, nothing is debited,
/// and the next tick evaluates fresh.
#[derive(Debug, Error)]
pub enum EntryReject {
    /// Open-position cap reached
    #[error("max concurrent positions reached ({0})")]
    MaxPositions(usize),
    /// The asset already has an open position
    #[error("position already open for asset")]
    AlreadyOpen,
    /// The asset traded too recently
    #[error("asset in cooldown for another {0}s")]
    Cooldown(i64),
    /// Not enough balance for the configured bet
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance {
        balance: Decimal,
        required: Decimal,
    },
    /// Entries halted after a losing streak
    #[error("entries halted after {0} consecutive losses")]
    Halted(u32),
    /// The venue refused or timed out
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Tracker tunables, resolved from configuration at startup
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Quote-currency amount per trade
    pub bet_amount: Decimal,
    /// Maximum concurrent open positions
    pub max_positions: usize,
    /// Re-entry cooldown per asset
    pub cooldown: Duration,
    /// Force-close positions this close to market expiry
    pub min_close_buffer: Duration,
    /// Force-close positions held longer than this
    pub max_hold: Duration,
    /// Halt entries after this many consecutive losses
    pub max_consecutive_losses: u32,
    /// Bound on every gateway call; elapse counts as rejection
    pub gateway_timeout: std::time::Duration,
}

impl TrackerConfig {
    /// Build tracker tunables from the risk and execution sections
    pub fn from_config(risk: &RiskConfig, execution: &ExecutionConfig) -> Self {
        Self {
            bet_amount: risk.bet_amount,
            max_positions: risk.max_positions,
            cooldown: Duration::seconds(risk.cooldown_secs as i64),
            min_close_buffer: Duration::seconds(risk.min_close_buffer_secs as i64),
            max_hold: Duration::seconds(risk.max_hold_secs as i64),
            max_consecutive_losses: risk.max_consecutive_losses,
            gateway_timeout: std::time::Duration::from_secs(execution.gateway_timeout_secs),
        }
    }
}

/// Owns open positions, cooldowns, balance, and session statistics
///
/// All transitions go through this tracker; no other component mutates
/// position or balance state. Positions move OPEN -> CLOSED once and
/// closed positions are immutable history.
pub struct PositionTracker {
    gateway: Arc<dyn OrderGateway>,
    config: TrackerConfig,
    balance: Decimal,
    open: HashMap<Uuid, Position>,
    closed: Vec<ClosedPosition>,
    cooldowns: HashMap<String, DateTime<Utc>>,
    stats: SessionStats,
    halted: bool,
}

impl PositionTracker {
    /// Create a tracker with the given gateway and starting balance
    pub fn new(gateway: Arc<dyn OrderGateway>, config: TrackerConfig, balance: Decimal) -> Self {
        Self {
            gateway,
            config,
            balance,
            open: HashMap::new(),
            closed: Vec::new(),
            cooldowns: HashMap::new(),
            stats: SessionStats::new(balance),
            halted: false,
        }
    }

    /// Current balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Number of open positions
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Open positions
    pub fn open_positions(&self) -> Vec<&Position> {
        self.open.values().collect()
    }

    /// Closed position history
    pub fn closed_positions(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Session statistics
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Whether entries are halted by the loss-streak guard
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The open position for an asset, if any
    pub fn position_for_asset(&self, asset: &str) -> Option<&Position> {
        self.open.values().find(|p| p.asset == asset)
    }

    /// Check entry constraints without side effects
    pub fn check_entry(&self, asset: &str, now: DateTime<Utc>) -> Result<(), EntryReject> {
        if self.halted {
            return Err(EntryReject::Halted(self.stats.consecutive_losses));
        }
        if self.open.len() >= self.config.max_positions {
            return Err(EntryReject::MaxPositions(self.config.max_positions));
        }
        if self.position_for_asset(asset).is_some() {
            return Err(EntryReject::AlreadyOpen);
        }
        if let Some(last) = self.cooldowns.get(asset) {
            let since = now - *last;
            if since < self.config.cooldown {
                let remaining = (self.config.cooldown - since).num_seconds();
                return Err(EntryReject::Cooldown(remaining));
            }
        }
        if self.balance < self.config.bet_amount {
            return Err(EntryReject::InsufficientBalance {
                balance: self.balance,
                required: self.config.bet_amount,
            });
        }
        Ok(())
    }

    /// Act on an entry signal
    ///
    /// Returns the new position id, None for non-entry signals, or the
    /// rejection. Cooldown is recorded on every successful open.
    pub async fn try_open(
        &mut self,
        signal: &Signal,
        market_expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>, EntryReject> {
        let Some(side) = signal.entry_side() else {
            return Ok(None);
        };

        self.check_entry(&signal.asset, now)?;

        let order = OpenOrder {
            asset: signal.asset.clone(),
            side,
            amount: self.config.bet_amount,
            price: signal.price,
        };
        let execution = self.call_open(&order).await?;

        let position = Position {
            id: Uuid::new_v4(),
            asset: signal.asset.clone(),
            side,
            entry_price: execution.price,
            size: execution.size,
            entry_z: signal.z_score.unwrap_or_default(),
            opened_at: now,
            market_expiry,
        };

        self.balance -= position.cost();
        self.cooldowns.insert(signal.asset.clone(), now);

        tracing::info!(
            position_id = %position.id,
            asset = %position.asset,
            side = %position.side,
            entry_price = %position.entry_price,
            size = %position.size,
            entry_z = %position.entry_z,
            balance = %self.balance,
            "Position opened"
        );

        let id = position.id;
        self.open.insert(id, position);
        Ok(Some(id))
    }

    /// Close the open position for an asset
    ///
    /// A gateway failure leaves the position open; it is retried on the
    /// next tick. Returns the closed record on success, None when no
    /// position is open for the asset.
    pub async fn try_close(
        &mut self,
        asset: &str,
        price: Decimal,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Result<Option<ClosedPosition>, GatewayError> {
        let Some(id) = self.position_for_asset(asset).map(|p| p.id) else {
            tracing::debug!(asset, "Exit signal with no open position");
            return Ok(None);
        };
        self.close_by_id(id, price, reason, now).await.map(Some)
    }

    /// Force-close every position too close to expiry or held too long
    ///
    /// Runs every tick before signal evaluation, regardless of Z-score.
    /// Returns the number of positions closed.
    pub async fn force_close_due(
        &mut self,
        prices: &HashMap<String, Decimal>,
        now: DateTime<Utc>,
    ) -> usize {
        let due: Vec<(Uuid, ExitReason)> = self
            .open
            .values()
            .filter_map(|p| {
                if p.market_expiry - now <= self.config.min_close_buffer {
                    Some((p.id, ExitReason::ExpiryBuffer))
                } else if now - p.opened_at > self.config.max_hold {
                    Some((p.id, ExitReason::MaxHold))
                } else {
                    None
                }
            })
            .collect();

        let mut closed = 0;
        for (id, reason) in due {
            match self.close_with_last_price(id, prices, reason, now).await {
                Ok(()) => closed += 1,
                Err(e) => {
                    tracing::warn!(position_id = %id, error = %e, "Forced close failed, will retry");
                }
            }
        }
        closed
    }

    /// Close every open position (shutdown path)
    pub async fn close_all(&mut self, prices: &HashMap<String, Decimal>, now: DateTime<Utc>) {
        let ids: Vec<Uuid> = self.open.keys().copied().collect();
        for id in ids {
            if let Err(e) = self
                .close_with_last_price(id, prices, ExitReason::Shutdown, now)
                .await
            {
                tracing::error!(position_id = %id, error = %e, "Failed to close position on shutdown");
            }
        }
    }

    async fn close_with_last_price(
        &mut self,
        id: Uuid,
        prices: &HashMap<String, Decimal>,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let Some(position) = self.open.get(&id) else {
            return Ok(());
        };
        // Fall back to the entry price if the feed never priced the asset
        let price = prices
            .get(&position.asset)
            .copied()
            .unwrap_or(position.entry_price);
        self.close_by_id(id, price, reason, now).await.map(|_| ())
    }

    async fn close_by_id(
        &mut self,
        id: Uuid,
        price: Decimal,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Result<ClosedPosition, GatewayError> {
        // Clone so no position state mutates before the venue accepts
        let Some(position) = self.open.get(&id).cloned() else {
            return Err(GatewayError::Rejected("unknown position".to_string()));
        };

        let order = CloseOrder {
            position_id: id,
            asset: position.asset.clone(),
            side: position.side,
            size: position.size,
            price,
        };
        let execution = self.call_close(&order).await?;

        let pnl = (execution.price - position.entry_price) * position.size * position.side.sign();
        self.balance += position.cost() + pnl;
        self.stats.record(pnl);
        self.open.remove(&id);

        let closed = ClosedPosition {
            position,
            exit_price: execution.price,
            closed_at: now,
            pnl,
            reason,
        };

        tracing::info!(
            position_id = %id,
            asset = %closed.position.asset,
            side = %closed.position.side,
            exit_price = %closed.exit_price,
            pnl = %closed.pnl,
            reason = %closed.reason,
            balance = %self.balance,
            "Position closed"
        );

        if !self.halted && self.stats.consecutive_losses >= self.config.max_consecutive_losses {
            self.halted = true;
            tracing::error!(
                consecutive_losses = self.stats.consecutive_losses,
                "Halting new entries after losing streak"
            );
        }

        self.closed.push(closed.clone());
        Ok(closed)
    }

    async fn call_open(&self, order: &OpenOrder) -> Result<Execution, GatewayError> {
        match tokio::time::timeout(self.config.gateway_timeout, self.gateway.open(order)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    async fn call_close(&self, order: &CloseOrder) -> Result<Execution, GatewayError> {
        match tokio::time::timeout(self.config.gateway_timeout, self.gateway.close(order)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::PaperGateway;
    use crate::signal::{Side, Signal, SignalKind};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct RejectingGateway;

    #[async_trait]
    impl OrderGateway for RejectingGateway {
        async fn open(&self, _order: &OpenOrder) -> Result<Execution, GatewayError> {
            Err(GatewayError::Rejected("venue says no".to_string()))
        }
        async fn close(&self, _order: &CloseOrder) -> Result<Execution, GatewayError> {
            Err(GatewayError::Rejected("venue says no".to_string()))
        }
    }

    struct StallingGateway;

    #[async_trait]
    impl OrderGateway for StallingGateway {
        async fn open(&self, _order: &OpenOrder) -> Result<Execution, GatewayError> {
            std::future::pending().await
        }
        async fn close(&self, _order: &CloseOrder) -> Result<Execution, GatewayError> {
            std::future::pending().await
        }
    }

    fn config() -> TrackerConfig {
        TrackerConfig {
            bet_amount: dec!(10),
            max_positions: 5,
            cooldown: Duration::seconds(60),
            min_close_buffer: Duration::seconds(120),
            max_hold: Duration::seconds(300),
            max_consecutive_losses: 5,
            gateway_timeout: std::time::Duration::from_secs(5),
        }
    }

    fn tracker() -> PositionTracker {
        PositionTracker::new(Arc::new(PaperGateway::new(dec!(0))), config(), dec!(100))
    }

    fn enter_signal(asset: &str, kind: SignalKind, price: Decimal) -> Signal {
        Signal::new(asset, kind, Some(dec!(3)), price, Utc::now())
    }

    #[tokio::test]
    async fn test_open_position() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);
        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));

        let id = tracker.try_open(&signal, expiry, now).await.unwrap();
        assert!(id.is_some());
        assert_eq!(tracker.open_count(), 1);
        assert_eq!(tracker.balance(), dec!(90));

        let pos = tracker.position_for_asset("BTC").unwrap();
        assert_eq!(pos.side, Side::No);
        assert_eq!(pos.entry_price, dec!(100));
        assert_eq!(pos.size, dec!(0.1));
    }

    #[tokio::test]
    async fn test_non_entry_signal_is_noop() {
        let mut tracker = tracker();
        let now = Utc::now();
        let signal = Signal::none("BTC", None, dec!(100), now);

        let id = tracker
            .try_open(&signal, now + Duration::seconds(600), now)
            .await
            .unwrap();
        assert!(id.is_none());
        assert_eq!(tracker.open_count(), 0);
    }

    #[tokio::test]
    async fn test_max_positions_rejects_sixth() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        for asset in ["BTC", "ETH", "SOL", "DOGE", "XRP"] {
            let signal = enter_signal(asset, SignalKind::EnterYes, dec!(100));
            tracker.try_open(&signal, expiry, now).await.unwrap();
        }
        assert_eq!(tracker.open_count(), 5);

        // A sixth distinct asset is rejected; count stays 5
        let signal = enter_signal("ADA", SignalKind::EnterYes, dec!(100));
        let err = tracker.try_open(&signal, expiry, now).await.unwrap_err();
        assert!(matches!(err, EntryReject::MaxPositions(5)));
        assert_eq!(tracker.open_count(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_asset_rejected() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        tracker.try_open(&signal, expiry, now).await.unwrap();

        let err = tracker.try_open(&signal, expiry, now).await.unwrap_err();
        assert!(matches!(err, EntryReject::AlreadyOpen));
    }

    #[tokio::test]
    async fn test_cooldown_blocks_reentry() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        tracker.try_open(&signal, expiry, now).await.unwrap();
        tracker
            .try_close("BTC", dec!(100), ExitReason::MeanReversion, now)
            .await
            .unwrap();

        // Within the cooldown window the same asset is rejected
        let later = now + Duration::seconds(30);
        let err = tracker.try_open(&signal, expiry, later).await.unwrap_err();
        assert!(matches!(err, EntryReject::Cooldown(_)));

        // After the cooldown it opens again under a fresh id
        let after = now + Duration::seconds(61);
        let id = tracker.try_open(&signal, expiry, after).await.unwrap();
        assert!(id.is_some());
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejected() {
        let gateway = Arc::new(PaperGateway::new(dec!(0)));
        let mut tracker = PositionTracker::new(gateway, config(), dec!(5));
        let now = Utc::now();

        let signal = enter_signal("BTC", SignalKind::EnterYes, dec!(100));
        let err = tracker
            .try_open(&signal, now + Duration::seconds(600), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EntryReject::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn test_gateway_rejection_leaves_no_state() {
        let mut tracker = PositionTracker::new(Arc::new(RejectingGateway), config(), dec!(100));
        let now = Utc::now();

        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        let err = tracker
            .try_open(&signal, now + Duration::seconds(600), now)
            .await
            .unwrap_err();

        assert!(matches!(err, EntryReject::Gateway(GatewayError::Rejected(_))));
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.balance(), dec!(100));
        // No cooldown recorded for a failed open
        assert!(tracker.check_entry("BTC", now).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_timeout_is_rejection() {
        let mut tracker = PositionTracker::new(Arc::new(StallingGateway), config(), dec!(100));
        let now = Utc::now();

        let signal = enter_signal("BTC", SignalKind::EnterYes, dec!(100));
        let err = tracker
            .try_open(&signal, now + Duration::seconds(600), now)
            .await
            .unwrap_err();

        assert!(matches!(err, EntryReject::Gateway(GatewayError::Timeout)));
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.balance(), dec!(100));
    }

    #[tokio::test]
    async fn test_close_computes_pnl_yes_side() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        // Yes at 100, size 0.1
        let signal = enter_signal("BTC", SignalKind::EnterYes, dec!(100));
        tracker.try_open(&signal, expiry, now).await.unwrap();

        let closed = tracker
            .try_close("BTC", dec!(100.5), ExitReason::MeanReversion, now)
            .await
            .unwrap()
            .unwrap();

        // (100.5 - 100) * 0.1 * +1 = 0.05
        assert_eq!(closed.pnl, dec!(0.05));
        assert_eq!(closed.exit_price, dec!(100.5));
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.balance(), dec!(100.05));
        assert_eq!(tracker.stats().total_trades, 1);
        assert_eq!(tracker.stats().winning_trades, 1);
    }

    #[tokio::test]
    async fn test_close_computes_pnl_no_side() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        tracker.try_open(&signal, expiry, now).await.unwrap();

        // Price fell to 99: No side profits
        let closed = tracker
            .try_close("BTC", dec!(99), ExitReason::MeanReversion, now)
            .await
            .unwrap()
            .unwrap();

        // (99 - 100) * 0.1 * -1 = 0.1
        assert_eq!(closed.pnl, dec!(0.1));
        assert_eq!(tracker.balance(), dec!(100.1));
    }

    #[tokio::test]
    async fn test_close_without_position_is_noop() {
        let mut tracker = tracker();
        let result = tracker
            .try_close("BTC", dec!(100), ExitReason::MeanReversion, Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_closed_position_never_mutates() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        let signal = enter_signal("BTC", SignalKind::EnterYes, dec!(100));
        tracker.try_open(&signal, expiry, now).await.unwrap();
        tracker
            .try_close("BTC", dec!(101), ExitReason::MeanReversion, now)
            .await
            .unwrap();

        let pnl_at_close = tracker.closed_positions()[0].pnl;

        // A new trade on the same asset creates a new id, untouched history
        let later = now + Duration::seconds(61);
        tracker.try_open(&signal, expiry, later).await.unwrap();
        tracker
            .try_close("BTC", dec!(99), ExitReason::MeanReversion, later)
            .await
            .unwrap();

        assert_eq!(tracker.closed_positions().len(), 2);
        assert_eq!(tracker.closed_positions()[0].pnl, pnl_at_close);
        assert_ne!(
            tracker.closed_positions()[0].position.id,
            tracker.closed_positions()[1].position.id
        );
    }

    #[tokio::test]
    async fn test_force_close_expiry_buffer() {
        let mut tracker = tracker();
        let now = Utc::now();
        // Market expires in 130s; buffer is 120s
        let expiry = now + Duration::seconds(130);

        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        tracker.try_open(&signal, expiry, now).await.unwrap();

        let prices = HashMap::from([("BTC".to_string(), dec!(100))]);

        // 5s in: 125s remain, outside the buffer
        let closed = tracker
            .force_close_due(&prices, now + Duration::seconds(5))
            .await;
        assert_eq!(closed, 0);
        assert_eq!(tracker.open_count(), 1);

        // 10s in: 120s remain, forced close fires regardless of Z-score
        let closed = tracker
            .force_close_due(&prices, now + Duration::seconds(10))
            .await;
        assert_eq!(closed, 1);
        assert_eq!(tracker.open_count(), 0);
        assert_eq!(
            tracker.closed_positions()[0].reason,
            ExitReason::ExpiryBuffer
        );
    }

    #[tokio::test]
    async fn test_force_close_max_hold() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(3600);

        let signal = enter_signal("ETH", SignalKind::EnterYes, dec!(4000));
        tracker.try_open(&signal, expiry, now).await.unwrap();

        let prices = HashMap::from([("ETH".to_string(), dec!(4000))]);

        let closed = tracker
            .force_close_due(&prices, now + Duration::seconds(300))
            .await;
        assert_eq!(closed, 0);

        let closed = tracker
            .force_close_due(&prices, now + Duration::seconds(301))
            .await;
        assert_eq!(closed, 1);
        assert_eq!(tracker.closed_positions()[0].reason, ExitReason::MaxHold);
    }

    #[tokio::test]
    async fn test_force_close_gateway_failure_keeps_position() {
        let gateway = Arc::new(PaperGateway::new(dec!(0)));
        let mut tracker = PositionTracker::new(gateway, config(), dec!(100));
        let now = Utc::now();
        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        tracker
            .try_open(&signal, now + Duration::seconds(130), now)
            .await
            .unwrap();

        // Swap in a rejecting gateway to simulate venue failure
        tracker.gateway = Arc::new(RejectingGateway);
        let prices = HashMap::from([("BTC".to_string(), dec!(100))]);
        let closed = tracker
            .force_close_due(&prices, now + Duration::seconds(20))
            .await;

        // Close failed: position stays open for retry next tick
        assert_eq!(closed, 0);
        assert_eq!(tracker.open_count(), 1);

        // Venue recovers: retried close succeeds
        tracker.gateway = Arc::new(PaperGateway::new(dec!(0)));
        let closed = tracker
            .force_close_due(&prices, now + Duration::seconds(21))
            .await;
        assert_eq!(closed, 1);
        assert_eq!(tracker.open_count(), 0);
    }

    #[tokio::test]
    async fn test_close_all_on_shutdown() {
        let mut tracker = tracker();
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        for asset in ["BTC", "ETH"] {
            let signal = enter_signal(asset, SignalKind::EnterYes, dec!(100));
            tracker.try_open(&signal, expiry, now).await.unwrap();
        }

        let prices = HashMap::from([
            ("BTC".to_string(), dec!(100)),
            ("ETH".to_string(), dec!(100)),
        ]);
        tracker.close_all(&prices, now).await;

        assert_eq!(tracker.open_count(), 0);
        assert_eq!(tracker.closed_positions().len(), 2);
        assert!(tracker
            .closed_positions()
            .iter()
            .all(|c| c.reason == ExitReason::Shutdown));
    }

    #[tokio::test]
    async fn test_loss_streak_halts_entries() {
        let mut config = config();
        config.max_consecutive_losses = 2;
        config.cooldown = Duration::seconds(0);
        let mut tracker =
            PositionTracker::new(Arc::new(PaperGateway::new(dec!(0))), config, dec!(100));
        let now = Utc::now();
        let expiry = now + Duration::seconds(600);

        // Two losing Yes trades in a row
        for i in 0..2 {
            let t = now + Duration::seconds(i);
            let signal = enter_signal("BTC", SignalKind::EnterYes, dec!(100));
            tracker.try_open(&signal, expiry, t).await.unwrap();
            tracker
                .try_close("BTC", dec!(90), ExitReason::OverCorrection, t)
                .await
                .unwrap();
        }

        assert!(tracker.is_halted());
        let signal = enter_signal("ETH", SignalKind::EnterYes, dec!(100));
        let err = tracker.try_open(&signal, expiry, now).await.unwrap_err();
        assert!(matches!(err, EntryReject::Halted(2)));
    }

    #[tokio::test]
    async fn test_missing_price_falls_back_to_entry() {
        let mut tracker = tracker();
        let now = Utc::now();
        let signal = enter_signal("BTC", SignalKind::EnterNo, dec!(100));
        tracker
            .try_open(&signal, now + Duration::seconds(130), now)
            .await
            .unwrap();

        // No price snapshot for the asset: forced close uses entry price
        let closed = tracker
            .force_close_due(&HashMap::new(), now + Duration::seconds(20))
            .await;
        assert_eq!(closed, 1);
        assert_eq!(tracker.closed_positions()[0].exit_price, dec!(100));
        assert_eq!(tracker.closed_positions()[0].pnl, dec!(0));
    }
}
