use configuration::ExitParams;
use core_types::{Decision, Execution, OrderSide, ReasonTag};
use rust_decimal::Decimal;

/// What a strategy believes about one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    Idle,
    Long(LongPosition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongPosition {
    /// Average entry. Starts at the decision price and is replaced by fill prices
    /// as executions arrive.
    pub entry_price: Decimal,
    /// Quantity confirmed by executions; zero until the first fill is reported.
    pub filled_quantity: Decimal,
    pub last_fill_price: Decimal,
    /// Highest price seen since entry, for the trailing stop.
    pub peak_price: Decimal,
    pub entry_tick: u64,
    /// 0 for the initial entry, +1 for every DCA add.
    pub dca_level: u32,
    pub entry_reason: ReasonTag,
}

impl LongPosition {
    pub fn opened(price: Decimal, tick: u64, reason: ReasonTag) -> Self {
        Self {
            entry_price: price,
            filled_quantity: Decimal::ZERO,
            last_fill_price: price,
            peak_price: price,
            entry_tick: tick,
            dca_level: 0,
            entry_reason: reason,
        }
    }

    /// Folds a buy fill into the average entry.
    fn record_buy(&mut self, price: Decimal, quantity: Decimal) {
        let total = self.filled_quantity + quantity;
        if self.filled_quantity.is_zero() || total.is_zero() {
            self.entry_price = price;
        } else {
            self.entry_price = (self.entry_price * self.filled_quantity + price * quantity) / total;
        }
        self.filled_quantity = total;
        self.last_fill_price = price;
    }
}

/// Exit rules shared by every strategy family.
///
/// Checked in a fixed order: stop-loss, trailing stop, take-profit, timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitPolicy {
    pub take_profit_pct: Decimal,
    /// `None` disables the stop (DCA grids keep it unarmed until the last level).
    pub stop_loss_pct: Option<Decimal>,
    pub trailing_stop_pct: Option<Decimal>,
    pub max_hold_ticks: Option<u64>,
}

impl ExitPolicy {
    pub fn from_params(params: &ExitParams) -> Self {
        Self {
            take_profit_pct: params.take_profit_pct,
            stop_loss_pct: Some(params.stop_loss_pct),
            trailing_stop_pct: params.trailing_stop_pct,
            max_hold_ticks: params.max_hold_ticks,
        }
    }

    pub fn with_stop_loss(&self, stop_loss_pct: Option<Decimal>) -> Self {
        Self {
            stop_loss_pct,
            ..self.clone()
        }
    }

    pub fn evaluate(&self, position: &LongPosition, price: Decimal, held_ticks: u64) -> Option<ReasonTag> {
        let entry = position.entry_price;

        if let Some(stop) = self.stop_loss_pct {
            if price <= entry * (Decimal::ONE - stop) {
                return Some(ReasonTag::StopLoss);
            }
        }

        if let Some(trail) = self.trailing_stop_pct {
            let in_profit_at_peak = position.peak_price > entry;
            if in_profit_at_peak && price <= position.peak_price * (Decimal::ONE - trail) {
                return Some(ReasonTag::TrailingStop);
            }
        }

        if price >= entry * (Decimal::ONE + self.take_profit_pct) {
            return Some(ReasonTag::TakeProfit);
        }

        match self.max_hold_ticks {
            Some(limit) if held_ticks >= limit => Some(ReasonTag::Timeout),
            _ => None,
        }
    }
}

/// Applies the optimistic transition for a decision the strategy just emitted and
/// returns the state to roll back to if the order is rejected.
pub(crate) fn transition(state: &mut PositionState, decision: &Decision, tick: u64) -> PositionState {
    let previous = state.clone();
    match decision.side {
        OrderSide::Buy => match state {
            PositionState::Long(long) => {
                long.dca_level += 1;
                long.last_fill_price = decision.price;
            }
            PositionState::Idle => {
                *state = PositionState::Long(LongPosition::opened(decision.price, tick, decision.reason));
            }
        },
        OrderSide::Sell => *state = PositionState::Idle,
    }
    previous
}

/// Reconciles the believed state with an actual fill.
pub(crate) fn reconcile(state: &mut PositionState, execution: &Execution, tick: u64) {
    match execution.side {
        OrderSide::Buy => match state {
            PositionState::Long(long) => long.record_buy(execution.price, execution.quantity),
            PositionState::Idle => {
                // A fill we did not ask for; track it so it gets an exit.
                let mut long = LongPosition::opened(execution.price, tick, execution.reason);
                long.record_buy(execution.price, execution.quantity);
                *state = PositionState::Long(long);
            }
        },
        OrderSide::Sell => *state = PositionState::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn policy() -> ExitPolicy {
        ExitPolicy {
            take_profit_pct: dec!(0.02),
            stop_loss_pct: Some(dec!(0.03)),
            trailing_stop_pct: None,
            max_hold_ticks: Some(10),
        }
    }

    fn long_at(price: Decimal) -> LongPosition {
        LongPosition::opened(price, 0, ReasonTag::ZScoreEntry)
    }

    fn buy_fill(price: Decimal, quantity: Decimal) -> Execution {
        Execution {
            execution_id: Uuid::new_v4(),
            client_order_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            side: OrderSide::Buy,
            price,
            quantity,
            fee: Decimal::ZERO,
            timestamp: Utc::now(),
            reason: ReasonTag::DcaAdd,
        }
    }

    #[test]
    fn exit_order_and_thresholds() {
        let position = long_at(dec!(100));
        assert_eq!(policy().evaluate(&position, dec!(97), 1), Some(ReasonTag::StopLoss));
        assert_eq!(policy().evaluate(&position, dec!(102), 1), Some(ReasonTag::TakeProfit));
        assert_eq!(policy().evaluate(&position, dec!(100), 10), Some(ReasonTag::Timeout));
        assert_eq!(policy().evaluate(&position, dec!(101), 9), None);
        // Stop-loss wins over timeout on the same tick.
        assert_eq!(policy().evaluate(&position, dec!(96), 10), Some(ReasonTag::StopLoss));
    }

    #[test]
    fn unarmed_stop_never_fires() {
        let position = long_at(dec!(100));
        let unarmed = policy().with_stop_loss(None);
        assert_eq!(unarmed.evaluate(&position, dec!(50), 1), None);
    }

    #[test]
    fn trailing_stop_needs_profit_first() {
        let trailing = ExitPolicy {
            take_profit_pct: dec!(0.5),
            stop_loss_pct: Some(dec!(0.1)),
            trailing_stop_pct: Some(dec!(0.02)),
            max_hold_ticks: None,
        };
        let mut position = long_at(dec!(100));
        // Never above entry: a 2% dip is not a trailing stop.
        assert_eq!(trailing.evaluate(&position, dec!(98), 1), None);

        position.peak_price = dec!(110);
        assert_eq!(trailing.evaluate(&position, dec!(108), 1), None);
        assert_eq!(trailing.evaluate(&position, dec!(107.8), 1), Some(ReasonTag::TrailingStop));
    }

    #[test]
    fn buy_fills_average_the_entry() {
        let mut state = PositionState::Long(long_at(dec!(100)));
        reconcile(&mut state, &buy_fill(dec!(101), dec!(1)), 0);
        reconcile(&mut state, &buy_fill(dec!(95), dec!(3)), 5);
        let PositionState::Long(long) = state else { panic!("expected long") };
        // (101*1 + 95*3) / 4
        assert_eq!(long.entry_price, dec!(96.5));
        assert_eq!(long.filled_quantity, dec!(4));
        assert_eq!(long.last_fill_price, dec!(95));
    }

    #[test]
    fn transition_returns_rollback_state() {
        let mut state = PositionState::Idle;
        let decision = Decision::buy(Utc::now(), "BTCUSDT", dec!(100), Decimal::ONE, ReasonTag::DcaEntry);
        let previous = transition(&mut state, &decision, 3);
        assert_eq!(previous, PositionState::Idle);
        assert!(matches!(&state, PositionState::Long(l) if l.entry_tick == 3 && l.dca_level == 0));

        let add = Decision::buy(Utc::now(), "BTCUSDT", dec!(98), dec!(1.5), ReasonTag::DcaAdd);
        let before_add = transition(&mut state, &add, 4);
        assert!(matches!(&state, PositionState::Long(l) if l.dca_level == 1 && l.last_fill_price == dec!(98)));
        assert!(matches!(before_add, PositionState::Long(l) if l.dca_level == 0));
    }
}
