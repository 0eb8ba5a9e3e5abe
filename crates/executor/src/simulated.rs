use crate::error::ExecutorError;
use chrono::{DateTime, Utc};
use configuration::Simulation;
use core_types::{Execution, OrderRequest, OrderSide};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A generic trait for an execution engine.
pub trait Executor: Send + Sync {
    /// Processes an `OrderRequest` and returns an `Execution` receipt.
    ///
    /// This calculates the costs of the trade (fees, slippage) but **does not modify
    /// the portfolio**. The caller applies the returned `Execution` to its `Portfolio`.
    fn execute(&self, order: &OrderRequest, timestamp: DateTime<Utc>) -> Result<Execution, ExecutorError>;
}

/// The "virtual exchange" for backtesting.
///
/// Fills every order in full at its reference price moved against the order by
/// `slippage_pct`, and charges `taker_fee_pct` of the filled notional.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    params: Simulation,
}

impl SimulatedExecutor {
    pub fn new(params: Simulation) -> Self {
        Self { params }
    }

    /// Calculates the execution price, modeling for slippage.
    fn slipped_price(&self, side: OrderSide, price: Decimal) -> Decimal {
        let slippage = price * self.params.slippage_pct;
        match side {
            // For a buy, slippage makes the price HIGHER (worse).
            OrderSide::Buy => price + slippage,
            // For a sell, slippage makes the price LOWER (worse).
            OrderSide::Sell => price - slippage,
        }
    }
}

impl Executor for SimulatedExecutor {
    fn execute(&self, order: &OrderRequest, timestamp: DateTime<Utc>) -> Result<Execution, ExecutorError> {
        if order.quantity <= Decimal::ZERO {
            return Err(ExecutorError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                order.quantity
            )));
        }
        if order.price <= Decimal::ZERO {
            return Err(ExecutorError::InvalidOrder(format!(
                "reference price must be positive, got {}",
                order.price
            )));
        }

        let price = self.slipped_price(order.side, order.price);
        let fee = price * order.quantity * self.params.taker_fee_pct;

        let execution = Execution {
            execution_id: Uuid::new_v4(),
            client_order_id: order.client_order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            price,
            quantity: order.quantity,
            fee,
            timestamp,
            reason: order.reason,
        };

        tracing::debug!(
            symbol = %execution.symbol,
            side = %execution.side,
            %price,
            quantity = %execution.quantity,
            %fee,
            "Simulated fill"
        );
        Ok(execution)
    }
}
