use crate::error::ExecutorError;
use core_types::{Execution, OrderSide, Position, ReasonTag, Trade};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

/// An open position plus what is needed to book it as a `Trade` when it closes.
#[derive(Debug, Clone)]
struct Lot {
    position: Position,
    /// Buy-side fees not yet attributed to a closed trade.
    fees: Decimal,
    entry_reason: ReasonTag,
}

/// Manages the state of a long-only trading account: cash and open positions.
/// Its sole responsibility is to reflect the account based on executions.
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    lots: BTreeMap<String, Lot>,
}

impl Portfolio {
    /// Creates a new `Portfolio` with a given amount of starting capital.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash: initial_capital,
            lots: BTreeMap::new(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.lots.values().map(|lot| &lot.position)
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.lots.get(symbol).map(|lot| &lot.position)
    }

    /// Applies an execution.
    ///
    /// Buys reduce cash and fold into the average entry. Sells reduce the position and
    /// return the closed `Trade` for the sold quantity; the position is removed once it
    /// reaches zero. The portfolio is left untouched when an error is returned.
    pub fn apply(&mut self, execution: &Execution) -> Result<Option<Trade>, ExecutorError> {
        match execution.side {
            OrderSide::Buy => {
                self.apply_buy(execution)?;
                Ok(None)
            }
            OrderSide::Sell => self.apply_sell(execution).map(Some),
        }
    }

    fn apply_buy(&mut self, execution: &Execution) -> Result<(), ExecutorError> {
        let cost = execution.price * execution.quantity + execution.fee;
        if cost > self.cash {
            return Err(ExecutorError::InsufficientCash {
                required: cost.to_string(),
                available: self.cash.to_string(),
            });
        }
        self.cash -= cost;

        let lot = self.lots.entry(execution.symbol.clone()).or_insert_with(|| Lot {
            position: Position {
                symbol: execution.symbol.clone(),
                quantity: Decimal::ZERO,
                entry_price: Decimal::ZERO,
                opened_at: execution.timestamp,
                last_updated: execution.timestamp,
                fills: 0,
            },
            fees: Decimal::ZERO,
            entry_reason: execution.reason,
        });

        let position = &mut lot.position;
        let total_quantity = position.quantity + execution.quantity;
        if !total_quantity.is_zero() {
            position.entry_price =
                (position.entry_price * position.quantity + execution.price * execution.quantity) / total_quantity;
        }
        position.quantity = total_quantity;
        position.last_updated = execution.timestamp;
        position.fills += 1;
        lot.fees += execution.fee;
        Ok(())
    }

    fn apply_sell(&mut self, execution: &Execution) -> Result<Trade, ExecutorError> {
        let symbol = &execution.symbol;
        let lot = self
            .lots
            .get_mut(symbol)
            .ok_or_else(|| ExecutorError::PositionNotFound(symbol.clone()))?;

        if execution.quantity > lot.position.quantity {
            return Err(ExecutorError::InvalidClosingQuantity {
                requested: execution.quantity.to_string(),
                available: lot.position.quantity.to_string(),
            });
        }

        // Attribute buy fees in proportion to the quantity being closed.
        let share = execution.quantity / lot.position.quantity;
        let entry_fees = lot.fees * share;

        let trade = Trade {
            trade_id: Uuid::new_v4(),
            symbol: symbol.clone(),
            entry_time: lot.position.opened_at,
            exit_time: execution.timestamp,
            entry_price: lot.position.entry_price,
            exit_price: execution.price,
            quantity: execution.quantity,
            fees: entry_fees + execution.fee,
            entry_reason: lot.entry_reason,
            exit_reason: execution.reason,
            fills: lot.position.fills,
        };

        self.cash += execution.price * execution.quantity - execution.fee;
        lot.fees -= entry_fees;
        lot.position.quantity -= execution.quantity;
        lot.position.last_updated = execution.timestamp;
        if lot.position.quantity.is_zero() {
            self.lots.remove(symbol);
        }

        tracing::debug!(
            %symbol,
            net = %trade.net_profit(),
            exit = %trade.exit_reason,
            "Trade closed"
        );
        Ok(trade)
    }

    /// Calculates the total equity of the portfolio at a given set of market prices.
    /// Equity = cash + market value of all open positions. Symbols without a quote are
    /// valued at their entry price.
    pub fn total_equity(&self, prices: &BTreeMap<String, Decimal>) -> Decimal {
        self.positions().fold(self.cash, |equity, position| {
            let price = prices.get(&position.symbol).copied().unwrap_or(position.entry_price);
            equity + position.market_value(price)
        })
    }
}
