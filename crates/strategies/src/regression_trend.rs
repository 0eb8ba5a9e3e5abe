use crate::book::SymbolBook;
use crate::error::StrategyError;
use crate::hive::HiveGuard;
use crate::position::ExitPolicy;
use crate::{param_f64, validate_exit, validate_window, Strategy};
use configuration::RegressionTrendParams;
use core_types::{Decision, Execution, HiveSignal, PriceUpdate, ReasonTag};
use indicators::linear_regression;
use rust_decimal::prelude::*;
use std::collections::HashMap;
use ta::indicators::ExponentialMovingAverage as Ema;
use ta::Next;

/// Rides short-term linear trends.
///
/// Entry requires a positive regression slope (as a fraction of price, per tick), a fit
/// good enough to trust, and the price trading above its EMA. The position is closed by
/// the exit policy or as soon as the fitted slope turns negative.
pub struct RegressionTrend {
    params: RegressionTrendParams,
    book: SymbolBook,
    guard: HiveGuard,
    exit: ExitPolicy,
    /// One EMA per symbol, fed on every tick the symbol is quoted.
    emas: HashMap<String, Ema>,
    ema_values: HashMap<String, f64>,
    min_slope_pct: f64,
    min_r_squared: f64,
}

impl RegressionTrend {
    pub fn new(params: RegressionTrendParams, penalized: &[ReasonTag]) -> Result<Self, StrategyError> {
        validate_window(params.window, 3)?;
        validate_exit(&params.exit)?;
        if params.ema_period == 0 {
            return Err(StrategyError::InvalidParameters("ema_period must be at least 1".to_string()));
        }
        if params.min_slope_pct < Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "min_slope_pct must not be negative".to_string(),
            ));
        }
        if params.min_r_squared < Decimal::ZERO || params.min_r_squared > Decimal::ONE {
            return Err(StrategyError::InvalidParameters(
                "min_r_squared must be in [0, 1]".to_string(),
            ));
        }

        Ok(Self {
            book: SymbolBook::new(params.window, params.exit.cooldown_ticks),
            guard: HiveGuard::new(penalized),
            exit: ExitPolicy::from_params(&params.exit),
            emas: HashMap::new(),
            ema_values: HashMap::new(),
            min_slope_pct: param_f64(params.min_slope_pct, "min_slope_pct")?,
            min_r_squared: param_f64(params.min_r_squared, "min_r_squared")?,
            params,
        })
    }

    fn update_emas(&mut self, update: &PriceUpdate) -> Result<(), StrategyError> {
        for (symbol, price) in &update.prices {
            // Non-positive prices are rejected by the book; skip them here so the
            // error surfaces from one place.
            if *price <= Decimal::ZERO {
                continue;
            }
            let value = price.to_f64().ok_or_else(|| {
                StrategyError::IndicatorError(format!("price {} for {} does not fit in f64", price, symbol))
            })?;
            if !self.emas.contains_key(symbol) {
                let ema = Ema::new(self.params.ema_period)
                    .map_err(|e| StrategyError::IndicatorError(e.to_string()))?;
                self.emas.insert(symbol.clone(), ema);
            }
            if let Some(ema) = self.emas.get_mut(symbol) {
                self.ema_values.insert(symbol.clone(), ema.next(value));
            }
        }
        Ok(())
    }
}

impl Strategy for RegressionTrend {
    fn name(&self) -> &str {
        "regression-trend"
    }

    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Option<Decision>, StrategyError> {
        self.update_emas(update)?;

        let exit = &self.exit;
        let ema_values = &self.ema_values;
        let (min_slope_pct, min_r_squared) = (self.min_slope_pct, self.min_r_squared);

        self.book.decide(
            update,
            &self.guard,
            |_, state, price| {
                let held = state.held_ticks();
                if let Some(reason) = exit.evaluate(state.long()?, price, held) {
                    return Some(reason);
                }
                if !state.window.is_full() {
                    return None;
                }
                let fit = linear_regression(state.window.as_slice())?;
                (fit.slope_pct() < 0.0).then_some(ReasonTag::TrendReversal)
            },
            |symbol, state, price| {
                if !state.is_idle() || !state.window.is_full() {
                    return None;
                }
                let fit = linear_regression(state.window.as_slice())?;
                let ema = *ema_values.get(symbol)?;
                let above_ema = price.to_f64()? > ema;
                let breakout =
                    fit.slope_pct() >= min_slope_pct && fit.r_squared >= min_r_squared && above_ema;
                if breakout {
                    tracing::debug!(
                        %symbol,
                        slope_pct = fit.slope_pct(),
                        r_squared = fit.r_squared,
                        ema,
                        "Regression breakout"
                    );
                }
                breakout.then_some((ReasonTag::RegressionBreakout, Decimal::ONE))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{exit, tick};
    use rust_decimal_macros::dec;

    fn params() -> RegressionTrendParams {
        let mut exit = exit(dec!(0.5), dec!(0.1));
        exit.trailing_stop_pct = Some(dec!(0.02));
        RegressionTrendParams {
            window: 5,
            min_slope_pct: dec!(0.005),
            min_r_squared: dec!(0.9),
            ema_period: 3,
            exit,
        }
    }

    fn run(strategy: &mut RegressionTrend, prices: &[Decimal]) -> Vec<Option<Decision>> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| strategy.on_price_update(&tick(i as i64, "ETHUSDT", *p)).unwrap())
            .collect()
    }

    #[test]
    fn breakout_then_trailing_stop() {
        let mut strategy = RegressionTrend::new(params(), &[]).unwrap();
        let decisions = run(
            &mut strategy,
            &[dec!(100), dec!(101), dec!(102), dec!(103), dec!(104), dec!(110), dec!(107)],
        );

        assert!(decisions[..4].iter().all(Option::is_none));
        let entry = decisions[4].as_ref().unwrap();
        assert_eq!(entry.reason, ReasonTag::RegressionBreakout);
        assert_eq!(entry.price, dec!(104));
        assert!(decisions[5].is_none());
        assert_eq!(decisions[6].as_ref().unwrap().reason, ReasonTag::TrailingStop);
    }

    #[test]
    fn negative_slope_closes_the_trend() {
        let mut strategy = RegressionTrend::new(params(), &[]).unwrap();
        let decisions = run(
            &mut strategy,
            &[dec!(100), dec!(101), dec!(102), dec!(103), dec!(104), dec!(103), dec!(100)],
        );

        assert!(decisions[4].is_some());
        assert!(decisions[5].is_none());
        assert_eq!(decisions[6].as_ref().unwrap().reason, ReasonTag::TrendReversal);
    }

    #[test]
    fn flat_market_never_enters() {
        let mut strategy = RegressionTrend::new(params(), &[]).unwrap();
        let decisions = run(&mut strategy, &[dec!(100); 8]);
        assert!(decisions.iter().all(Option::is_none));
    }

    #[test]
    fn rejects_out_of_range_r_squared() {
        let mut bad = params();
        bad.min_r_squared = dec!(1.5);
        assert!(RegressionTrend::new(bad, &[]).is_err());
    }
}
