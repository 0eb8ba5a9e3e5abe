use crate::book::SymbolBook;
use crate::error::StrategyError;
use crate::hive::HiveGuard;
use crate::position::ExitPolicy;
use crate::{param_f64, validate_exit, validate_window, Strategy};
use configuration::DcaGridParams;
use core_types::{Decision, Execution, HiveSignal, PriceUpdate, ReasonTag};
use indicators::z_score;
use rust_decimal::Decimal;

/// Dollar-cost averaging grid.
///
/// Opens on a z-score dip like `ZScoreReversion`, then buys more every time the price
/// falls another `dca_step_pct` below the last fill, scaling each add by
/// `size_multiplier`. The take-profit is measured from the averaged entry. The
/// stop-loss stays unarmed while another level can still be bought: it arms once every
/// level is used, or when the hive penalizes `DcaAdd` or pauses the symbol.
pub struct DcaGrid {
    params: DcaGridParams,
    book: SymbolBook,
    guard: HiveGuard,
    exit: ExitPolicy,
    entry_z: f64,
}

impl DcaGrid {
    pub fn new(params: DcaGridParams, penalized: &[ReasonTag]) -> Result<Self, StrategyError> {
        validate_window(params.window, 3)?;
        validate_exit(&params.exit)?;
        if params.entry_z <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters("entry_z must be positive".to_string()));
        }
        if params.dca_step_pct <= Decimal::ZERO || params.dca_step_pct >= Decimal::ONE {
            return Err(StrategyError::InvalidParameters(
                "dca_step_pct must be in (0, 1)".to_string(),
            ));
        }
        if params.size_multiplier <= Decimal::ZERO {
            return Err(StrategyError::InvalidParameters(
                "size_multiplier must be positive".to_string(),
            ));
        }
        if Self::level_weight(params.size_multiplier, params.max_dca_levels).is_none() {
            return Err(StrategyError::InvalidParameters(format!(
                "size_multiplier {} overflows at level {}",
                params.size_multiplier, params.max_dca_levels
            )));
        }

        Ok(Self {
            book: SymbolBook::new(params.window, params.exit.cooldown_ticks),
            guard: HiveGuard::new(penalized),
            exit: ExitPolicy::from_params(&params.exit),
            entry_z: param_f64(params.entry_z, "entry_z")?,
            params,
        })
    }

    /// Order weight for DCA `level` (1 for the first add). `None` on overflow.
    fn level_weight(multiplier: Decimal, level: u32) -> Option<Decimal> {
        (0..level).try_fold(Decimal::ONE, |weight, _| weight.checked_mul(multiplier))
    }
}

impl Strategy for DcaGrid {
    fn name(&self) -> &str {
        "dca-grid"
    }

    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Option<Decision>, StrategyError> {
        let armed = self.exit.clone();
        let unarmed = self.exit.with_stop_loss(None);
        let entry_z = self.entry_z;
        let guard = &self.guard;
        let (max_levels, step, multiplier) = (
            self.params.max_dca_levels,
            self.params.dca_step_pct,
            self.params.size_multiplier,
        );

        self.book.decide(
            update,
            guard,
            |symbol, state, price| {
                let held = state.held_ticks();
                let long = state.long()?;
                let adds_blocked = long.dca_level >= max_levels
                    || guard.is_penalized(ReasonTag::DcaAdd)
                    || guard.is_paused(symbol);
                let policy = if adds_blocked { &armed } else { &unarmed };
                policy.evaluate(long, price, held)
            },
            |symbol, state, price| {
                if let Some(long) = state.long() {
                    if long.dca_level >= max_levels {
                        return None;
                    }
                    let trigger = long.last_fill_price * (Decimal::ONE - step);
                    if price > trigger {
                        return None;
                    }
                    let level = long.dca_level + 1;
                    tracing::debug!(%symbol, level, %trigger, "DCA level triggered");
                    return Some((ReasonTag::DcaAdd, Self::level_weight(multiplier, level)?));
                }

                if !state.window.is_full() {
                    return None;
                }
                let z = z_score(state.window.as_slice())?;
                (z <= -entry_z).then_some((ReasonTag::DcaEntry, Decimal::ONE))
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
