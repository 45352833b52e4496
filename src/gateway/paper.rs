//! Paper trading gateway

use super::{CloseOrder, Execution, GatewayError, OpenOrder, OrderGateway, OrderId};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

/// Simulated venue with deterministic slippage
///
/// Fills every sane order immediately: buys fill above the reference
/// price, sells below, both by the configured slippage fraction.
/// Balance accounting stays with the position tracker; this gateway
/// only models the venue side of the contract.
pub struct PaperGateway {
    slippage: Decimal,
}

impl PaperGateway {
    /// Create a paper gateway with the given slippage estimate
    pub fn new(slippage: Decimal) -> Self {
        Self { slippage }
    }

    fn buy_price(&self, reference: Decimal) -> Decimal {
        reference * (Decimal::ONE + self.slippage)
    }

    fn sell_price(&self, reference: Decimal) -> Decimal {
        reference * (Decimal::ONE - self.slippage)
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn open(&self, order: &OpenOrder) -> Result<Execution, GatewayError> {
        if order.amount <= Decimal::ZERO {
            return Err(GatewayError::Rejected("non-positive amount".to_string()));
        }
        if order.price <= Decimal::ZERO {
            return Err(GatewayError::Rejected("no reference price".to_string()));
        }

        let fill_price = self.buy_price(order.price);
        let size = order.amount / fill_price;
        let execution = Execution {
            order_id: OrderId::new_v4(),
            price: fill_price,
            size,
            timestamp: Utc::now(),
        };

        tracing::info!(
            asset = %order.asset,
            side = %order.side,
            price = %fill_price,
            size = %size,
            "Paper open filled"
        );
        Ok(execution)
    }

    async fn close(&self, order: &CloseOrder) -> Result<Execution, GatewayError> {
        if order.size <= Decimal::ZERO {
            return Err(GatewayError::Rejected("non-positive size".to_string()));
        }
        if order.price <= Decimal::ZERO {
            return Err(GatewayError::Rejected("no reference price".to_string()));
        }

        let fill_price = self.sell_price(order.price);
        let execution = Execution {
            order_id: OrderId::new_v4(),
            price: fill_price,
            size: order.size,
            timestamp: Utc::now(),
        };

        tracing::info!(
            asset = %order.asset,
            side = %order.side,
            price = %fill_price,
            size = %order.size,
            "Paper close filled"
        );
        Ok(execution)
    }
}
