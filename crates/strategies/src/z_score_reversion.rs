use crate::book::SymbolBook;
use crate::error::StrategyError;
use crate::hive::HiveGuard;
use crate::position::ExitPolicy;
use crate::{param_f64, validate_exit, validate_window, Strategy};
use configuration::ZScoreReversionParams;
use core_types::{Decision, Execution, HiveSignal, PriceUpdate, ReasonTag};
use indicators::{rsi, z_score};
use rust_decimal::Decimal;

/// Z-score mean reversion.
///
/// Buys when the latest price sits `entry_z` standard deviations below the window mean,
/// optionally confirmed by an oversold RSI. Sells on the shared exit policy, or once the
/// z-score has climbed back to `exit_z`.
pub struct ZScoreReversion {
    params: ZScoreReversionParams,
    book: SymbolBook,
    guard: HiveGuard,
    exit: ExitPolicy,
    entry_z: f64,
    exit_z: f64,
    rsi_oversold: f64,
}

impl ZScoreReversion {
    pub fn new(params: ZScoreReversionParams, penalized: &[ReasonTag]) -> Result<Self, StrategyError> {
        validate_window(params.window, 3)?;
        validate_exit(&params.exit)?;
        if params.entry_z <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters("entry_z must be positive".to_string()));
        }
        if params.rsi_filter {
            if params.rsi_period == 0 || params.rsi_period >= params.window {
                return Err(StrategyError::InvalidParameters(
                    "rsi_period must be in [1, window)".to_string(),
                ));
            }
            if params.rsi_oversold <= Decimal::ZERO || params.rsi_oversold >= Decimal::ONE_HUNDRED {
                return Err(StrategyError::InvalidParameters(
                    "rsi_oversold must be in (0, 100)".to_string(),
                ));
            }
        }

        Ok(Self {
            book: SymbolBook::new(params.window, params.exit.cooldown_ticks),
            guard: HiveGuard::new(penalized),
            exit: ExitPolicy::from_params(&params.exit),
            entry_z: param_f64(params.entry_z, "entry_z")?,
            exit_z: param_f64(params.exit_z, "exit_z")?,
            rsi_oversold: param_f64(params.rsi_oversold, "rsi_oversold")?,
            params,
        })
    }
}

impl Strategy for ZScoreReversion {
    fn name(&self) -> &str {
        "z-score-reversion"
    }

    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Option<Decision>, StrategyError> {
        let exit = &self.exit;
        let (entry_z, exit_z, rsi_oversold) = (self.entry_z, self.exit_z, self.rsi_oversold);
        let (rsi_filter, rsi_period) = (self.params.rsi_filter, self.params.rsi_period);

        self.book.decide(
            update,
            &self.guard,
            |_, state, price| {
                let held = state.held_ticks();
                if let Some(reason) = exit.evaluate(state.long()?, price, held) {
                    return Some(reason);
                }
                let z = z_score(state.window.as_slice())?;
                (z >= exit_z).then_some(ReasonTag::MeanReverted)
            },
            |_, state, _price| {
                if !state.is_idle() || !state.window.is_full() {
                    return None;
                }
                let values = state.window.as_slice();
                let z = z_score(values)?;
                if z > -entry_z {
                    return None;
                }
                if !rsi_filter {
                    return Some((ReasonTag::ZScoreEntry, Decimal::ONE));
                }
                let rsi = rsi(values, rsi_period)?;
                tracing::debug!(z, rsi, "Z-score entry candidate");
                (rsi < rsi_oversold).then_some((ReasonTag::RsiOversold, Decimal::ONE))
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

    fn params(rsi_filter: bool) -> ZScoreReversionParams {
        ZScoreReversionParams {
            window: 5,
            entry_z: dec!(1.5),
            exit_z: dec!(0),
            rsi_filter,
            rsi_period: 4,
            rsi_oversold: dec!(30),
            exit: exit(dec!(0.2), dec!(0.1)),
        }
    }

    fn run(strategy: &mut ZScoreReversion, prices: &[Decimal]) -> Vec<Option<Decision>> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| strategy.on_price_update(&tick(i as i64, "BTCUSDT", *p)).unwrap())
            .collect()
    }

    #[test]
    fn enters_on_dip_and_exits_when_mean_reverts() {
        let mut strategy = ZScoreReversion::new(params(false), &[]).unwrap();
        let decisions = run(
            &mut strategy,
            &[dec!(100), dec!(100), dec!(100), dec!(100), dec!(90), dec!(92), dec!(97)],
        );

        assert!(decisions[..4].iter().all(Option::is_none));
        let entry = decisions[4].as_ref().unwrap();
        assert_eq!(entry.reason, ReasonTag::ZScoreEntry);
        assert_eq!(entry.price, dec!(90));
        assert!(decisions[5].is_none());
        let exit = decisions[6].as_ref().unwrap();
        assert_eq!(exit.reason, ReasonTag::MeanReverted);
    }

    #[test]
    fn rsi_filter_changes_the_tag() {
        let mut strategy = ZScoreReversion::new(params(true), &[]).unwrap();
        let decisions = run(&mut strategy, &[dec!(100), dec!(100), dec!(100), dec!(100), dec!(90)]);
        assert_eq!(decisions[4].as_ref().unwrap().reason, ReasonTag::RsiOversold);
    }

    #[test]
    fn penalized_tag_blocks_entry_until_cleared() {
        let mut strategy = ZScoreReversion::new(params(true), &[ReasonTag::RsiOversold]).unwrap();
        let decisions = run(&mut strategy, &[dec!(100), dec!(100), dec!(100), dec!(100), dec!(90)]);
        assert!(decisions.iter().all(Option::is_none));

        strategy.on_hive_signal(&HiveSignal {
            cleared_tags: vec![ReasonTag::RsiOversold],
            ..Default::default()
        });
        let next = strategy.on_price_update(&tick(5, "BTCUSDT", dec!(85))).unwrap();
        assert_eq!(next.unwrap().reason, ReasonTag::RsiOversold);
    }

    #[test]
    fn stop_loss_precedes_mean_reversion() {
        let mut strategy = ZScoreReversion::new(params(false), &[]).unwrap();
        let decisions = run(
            &mut strategy,
            &[dec!(100), dec!(100), dec!(100), dec!(100), dec!(90), dec!(80)],
        );
        assert_eq!(decisions[5].as_ref().unwrap().reason, ReasonTag::StopLoss);
    }

    #[test]
    fn rejects_rsi_period_not_shorter_than_window() {
        let mut bad = params(true);
        bad.rsi_period = 5;
        assert!(matches!(
            ZScoreReversion::new(bad, &[]),
            Err(StrategyError::InvalidParameters(_))
        ));
    }
}
