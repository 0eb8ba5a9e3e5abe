use crate::error::RiskError;
use crate::{PortfolioSnapshot, RiskManager};
use configuration::RiskManagement;
use core_types::{Decision, OrderRequest, OrderSide};
use rust_decimal::{Decimal, RoundingStrategy};

/// Quantities are truncated to this many decimal places.
const QUANTITY_DP: u32 = 8;

/// A simple, concrete implementation of the `RiskManager` trait.
///
/// Buys risk a fixed fraction of equity, scaled by the decision's weight, then capped
/// by spendable cash and by the per-symbol exposure limit.
#[derive(Debug, Clone)]
pub struct SimpleRiskManager {
    params: RiskManagement,
}

impl SimpleRiskManager {
    /// Creates a new `SimpleRiskManager` with the given configuration parameters.
    ///
    /// It performs validation to ensure the parameters are logical.
    pub fn new(params: RiskManagement) -> Result<Self, RiskError> {
        if params.risk_per_trade_pct <= Decimal::ZERO || params.risk_per_trade_pct > Decimal::ONE {
            return Err(RiskError::InvalidParameters(
                "risk_per_trade_pct must be in (0, 1]".to_string(),
            ));
        }
        if params.max_position_pct <= Decimal::ZERO || params.max_position_pct > Decimal::ONE {
            return Err(RiskError::InvalidParameters(
                "max_position_pct must be in (0, 1]".to_string(),
            ));
        }
        if params.cash_buffer_pct < Decimal::ZERO || params.cash_buffer_pct >= Decimal::ONE {
            return Err(RiskError::InvalidParameters(
                "cash_buffer_pct must be in [0, 1)".to_string(),
            ));
        }
        Ok(Self { params })
    }

    fn size_buy(&self, decision: &Decision, portfolio: &PortfolioSnapshot) -> Result<Decimal, RiskError> {
        // --- 1. Validation ---
        if decision.price <= Decimal::ZERO {
            return Err(RiskError::InvalidEntryPrice(decision.price));
        }
        if portfolio.total_equity <= Decimal::ZERO {
            return Err(RiskError::InsufficientEquity(portfolio.total_equity));
        }

        // --- 2. Target notional from the fixed fraction and the strategy's weight ---
        let equity = portfolio.total_equity;
        let target = equity * self.params.risk_per_trade_pct * decision.weight;

        // --- 3. Caps: spendable cash, then remaining room under the exposure limit ---
        let spendable = portfolio.cash * (Decimal::ONE - self.params.cash_buffer_pct);
        let exposure = portfolio
            .position(&decision.symbol)
            .map_or(Decimal::ZERO, |p| p.market_value(decision.price));
        let room = equity * self.params.max_position_pct - exposure;
        let notional = target.min(spendable).min(room);

        // --- 4. Quantity ---
        let quantity = if notional > Decimal::ZERO {
            (notional / decision.price).round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero)
        } else {
            Decimal::ZERO
        };

        tracing::debug!(
            symbol = %decision.symbol,
            %target,
            %spendable,
            %room,
            %quantity,
            "Sized buy"
        );

        if quantity.is_zero() {
            return Err(RiskError::OrderTooSmall {
                symbol: decision.symbol.clone(),
                notional,
            });
        }
        Ok(quantity)
    }
}

impl RiskManager for SimpleRiskManager {
    fn size(&self, decision: &Decision, portfolio: &PortfolioSnapshot) -> Result<OrderRequest, RiskError> {
        let quantity = match decision.side {
            OrderSide::Buy => self.size_buy(decision, portfolio)?,
            OrderSide::Sell => portfolio
                .position(&decision.symbol)
                .map(|p| p.quantity)
                .filter(|q| *q > Decimal::ZERO)
                .ok_or_else(|| RiskError::NoPosition(decision.symbol.clone()))?,
        };

        Ok(OrderRequest {
            client_order_id: decision.decision_id,
            symbol: decision.symbol.clone(),
            side: decision.side,
            quantity,
            price: decision.price,
            reason: decision.reason,
        })
    }
}
