use crate::book::SymbolBook;
use crate::error::StrategyError;
use crate::hive::HiveGuard;
use crate::position::ExitPolicy;
use crate::{param_f64, validate_exit, validate_window, Strategy};
use configuration::BollingerRsiParams;
use core_types::{Decision, Execution, HiveSignal, PriceUpdate, ReasonTag};
use indicators::{atr, bollinger, rsi};
use rust_decimal::prelude::*;

/// Bollinger band bounce with RSI and volatility confirmation.
///
/// This strategy looks for a confluence of three conditions:
/// 1. Volatility: price has touched or crossed the lower band.
/// 2. Momentum: RSI is oversold.
/// 3. Regime: ATR relative to price is small enough that the dip is noise, not a crash.
///
/// Exits on the shared policy or once price is back at the middle band. The stop-loss is
/// widened to `atr_stop_mult` ATRs below entry whenever that is further away.
pub struct BollingerRsi {
    params: BollingerRsiParams,
    book: SymbolBook,
    guard: HiveGuard,
    exit: ExitPolicy,
    bb_std_dev: f64,
    rsi_oversold: f64,
    max_atr_pct: f64,
}

impl BollingerRsi {
    pub fn new(params: BollingerRsiParams, penalized: &[ReasonTag]) -> Result<Self, StrategyError> {
        validate_window(params.window, 3)?;
        validate_exit(&params.exit)?;
        if params.rsi_period == 0 || params.rsi_period >= params.window {
            return Err(StrategyError::InvalidParameters(
                "rsi_period must be in [1, window)".to_string(),
            ));
        }
        if params.atr_period == 0 || params.atr_period >= params.window {
            return Err(StrategyError::InvalidParameters(
                "atr_period must be in [1, window)".to_string(),
            ));
        }
        if params.bb_std_dev <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters("bb_std_dev must be positive".to_string()));
        }
        if params.max_atr_pct <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters("max_atr_pct must be positive".to_string()));
        }
        if params.atr_stop_mult < Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "atr_stop_mult must not be negative".to_string(),
            ));
        }

        Ok(Self {
            book: SymbolBook::new(params.window, params.exit.cooldown_ticks),
            guard: HiveGuard::new(penalized),
            exit: ExitPolicy::from_params(&params.exit),
            bb_std_dev: param_f64(params.bb_std_dev, "bb_std_dev")?,
            rsi_oversold: param_f64(params.rsi_oversold, "rsi_oversold")?,
            max_atr_pct: param_f64(params.max_atr_pct, "max_atr_pct")?,
            params,
        })
    }
}

impl Strategy for BollingerRsi {
    fn name(&self) -> &str {
        "bollinger-rsi"
    }

    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Option<Decision>, StrategyError> {
        let exit = &self.exit;
        let (bb_std_dev, rsi_oversold, max_atr_pct) = (self.bb_std_dev, self.rsi_oversold, self.max_atr_pct);
        let (rsi_period, atr_period, atr_stop_mult) =
            (self.params.rsi_period, self.params.atr_period, self.params.atr_stop_mult);

        self.book.decide(
            update,
            &self.guard,
            |_, state, price| {
                let held = state.held_ticks();
                let long = state.long()?.clone();
                let values = state.window.as_slice();

                let mut policy = exit.clone();
                if let Some(range) = atr(values, atr_period).and_then(Decimal::from_f64) {
                    if !long.entry_price.is_zero() {
                        let atr_stop = atr_stop_mult * range / long.entry_price;
                        let base = policy.stop_loss_pct.unwrap_or(Decimal::ZERO);
                        policy.stop_loss_pct = Some(base.max(atr_stop).min(Decimal::ONE));
                    }
                }
                if let Some(reason) = policy.evaluate(&long, price, held) {
                    return Some(reason);
                }

                let bands = bollinger(values, bb_std_dev)?;
                (price.to_f64()? >= bands.middle).then_some(ReasonTag::MeanReverted)
            },
            |symbol, state, price| {
                if !state.is_idle() || !state.window.is_full() {
                    return None;
                }
                let price = price.to_f64()?;
                let values = state.window.as_slice();
                let bands = bollinger(values, bb_std_dev)?;
                if price > bands.lower {
                    return None;
                }
                let rsi = rsi(values, rsi_period)?;
                let atr_pct = atr(values, atr_period)? / price;
                tracing::debug!(%symbol, lower = bands.lower, rsi, atr_pct, "Lower band touched");
                (rsi < rsi_oversold && atr_pct <= max_atr_pct)
                    .then_some((ReasonTag::BollingerBounce, Decimal::ONE))
            },
        )
    }

    fn on_trade_executed(&mut self, execution: &Execution) {
        self.book.on_trade_executed(execution);
    }

    fn on_order_rejected(&mut self, decision: &Decision) {
        self.book.on_order_rejected(decision);
    }

    fn on_hive_signal(&mut self, signal: &HiveSignal) {
        self.guard.apply(signal);
    }
}
