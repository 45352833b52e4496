//! Order gateway module
//!
//! Abstract sink for opening and closing positions; paper and live
//! venues implement the same contract

mod paper;

pub use paper::PaperGateway;

use crate::signal::Side;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order identifier
pub type OrderId = Uuid;

/// Gateway errors; all are recoverable from the tracker's perspective
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Venue refused the order (insufficient funds, closed market, ...)
    #[error("order rejected: {0}")]
    Rejected(String),
    /// Venue did not answer within the configured bound
    #[error("gateway call timed out")]
    Timeout,
}

/// Request to open a position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    /// Asset to trade
    pub asset: String,
    /// Trade side
    pub side: Side,
    /// Quote-currency amount to commit
    pub amount: Decimal,
    /// Reference price the order was decided at
    pub price: Decimal,
}

/// Request to close an open position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseOrder {
    /// Position being closed
    pub position_id: Uuid,
    /// Asset of the position
    pub asset: String,
    /// Side of the position
    pub side: Side,
    /// Size to unwind
    pub size: Decimal,
    /// Reference price the close was decided at
    pub price: Decimal,
}

/// An accepted execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// Venue order identifier
    pub order_id: OrderId,
    /// Fill price
    pub price: Decimal,
    /// Fill size
    pub size: Decimal,
    /// Fill timestamp
    pub timestamp: DateTime<Utc>,
}

/// Trait for venue execution implementations
///
/// The tracker makes no assumption about real vs. simulated
/// settlement; both sides of the seam honor the same contract.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Open a position; returns the fill or a rejection
    async fn open(&self, order: &OpenOrder) -> Result<Execution, GatewayError>;
    /// Close a position; returns the fill or a rejection
    async fn close(&self, order: &CloseOrder) -> Result<Execution, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::Rejected("insufficient funds".to_string());
        assert_eq!(err.to_string(), "order rejected: insufficient funds");

        let err = GatewayError::Timeout;
        assert_eq!(err.to_string(), "gateway call timed out");
    }
}
