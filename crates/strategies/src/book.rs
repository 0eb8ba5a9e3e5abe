use crate::error::StrategyError;
use crate::hive::HiveGuard;
use crate::position::{reconcile, transition, LongPosition, PositionState};
use core_types::{Decision, Execution, PriceUpdate, ReasonTag};
use indicators::PriceWindow;
use rust_decimal::prelude::*;
use std::collections::BTreeMap;

/// Everything a strategy tracks for a single symbol.
#[derive(Debug, Clone)]
pub struct SymbolState {
    pub window: PriceWindow,
    pub position: PositionState,
    /// Number of ticks this symbol has been quoted in.
    pub ticks: u64,
    pub cooldown_until: u64,
    rollback: Option<PositionState>,
}

impl SymbolState {
    fn new(window: usize) -> Self {
        Self {
            window: PriceWindow::new(window),
            position: PositionState::Idle,
            ticks: 0,
            cooldown_until: 0,
            rollback: None,
        }
    }

    pub fn long(&self) -> Option<&LongPosition> {
        match &self.position {
            PositionState::Long(long) => Some(long),
            PositionState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.position, PositionState::Idle)
    }

    pub fn held_ticks(&self) -> u64 {
        self.long().map_or(0, |long| self.ticks.saturating_sub(long.entry_tick))
    }

    pub fn in_cooldown(&self) -> bool {
        self.ticks < self.cooldown_until
    }
}

/// Per-symbol state for a strategy plus the shared per-tick decision loop.
///
/// The loop enforces the single-decision rule: every symbol's window is updated,
/// then exits are considered before entries, symbols in lexical order, and the first
/// candidate found is the only decision of the tick.
#[derive(Debug, Clone)]
pub struct SymbolBook {
    symbols: BTreeMap<String, SymbolState>,
    window: usize,
    cooldown_ticks: u64,
}

impl SymbolBook {
    pub fn new(window: usize, cooldown_ticks: u64) -> Self {
        Self {
            symbols: BTreeMap::new(),
            window,
            cooldown_ticks,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolState> {
        self.symbols.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Pushes every quoted price into its window and advances tick counters and peaks.
    /// The whole update is checked first, so a bad price leaves every symbol untouched.
    fn observe(&mut self, update: &PriceUpdate) -> Result<(), StrategyError> {
        let quotes = update
            .prices
            .iter()
            .map(|(symbol, price)| {
                if *price <= Decimal::ZERO {
                    return Err(StrategyError::InvalidInput(format!(
                        "non-positive price {} for {}",
                        price, symbol
                    )));
                }
                let value = price.to_f64().ok_or_else(|| {
                    StrategyError::IndicatorError(format!("price {} for {} does not fit in f64", price, symbol))
                })?;
                Ok((symbol, *price, value))
            })
            .collect::<Result<Vec<_>, StrategyError>>()?;

        let window = self.window;
        for (symbol, price, value) in quotes {
            let state = self
                .symbols
                .entry(symbol.clone())
                .or_insert_with(|| SymbolState::new(window));
            state.window.push(value);
            state.ticks += 1;
            if let PositionState::Long(long) = &mut state.position {
                long.peak_price = long.peak_price.max(price);
            }
        }
        Ok(())
    }

    /// Runs one tick.
    ///
    /// `exit_rule` is called for every long symbol and returns an exit tag.
    /// `entry_rule` is called for every symbol that is not cooling down or paused and
    /// returns an entry tag with a sizing weight; it also sees long symbols, which is
    /// how DCA adds are expressed.
    pub fn decide<X, E>(
        &mut self,
        update: &PriceUpdate,
        guard: &HiveGuard,
        mut exit_rule: X,
        mut entry_rule: E,
    ) -> Result<Option<Decision>, StrategyError>
    where
        X: FnMut(&str, &mut SymbolState, Decimal) -> Option<ReasonTag>,
        E: FnMut(&str, &mut SymbolState, Decimal) -> Option<(ReasonTag, Decimal)>,
    {
        self.observe(update)?;

        for (symbol, price) in &update.prices {
            let Some(state) = self.symbols.get_mut(symbol) else { continue };
            if state.is_idle() {
                continue;
            }
            if let Some(reason) = exit_rule(symbol, state, *price) {
                if guard.is_penalized(reason) {
                    tracing::warn!(%symbol, %reason, "Exiting with a penalized reason tag");
                }
                let decision = Decision::sell(update.timestamp, symbol, *price, reason);
                Self::apply(state, &decision, self.cooldown_ticks);
                tracing::debug!(%symbol, %reason, %price, "Exit decision");
                return Ok(Some(decision));
            }
        }

        for (symbol, price) in &update.prices {
            let Some(state) = self.symbols.get_mut(symbol) else { continue };
            if state.in_cooldown() || guard.is_paused(symbol) {
                continue;
            }
            if let Some((reason, weight)) = entry_rule(symbol, state, *price) {
                if guard.is_penalized(reason) {
                    tracing::debug!(%symbol, %reason, "Entry suppressed by hive penalty");
                    continue;
                }
                let decision = Decision::buy(update.timestamp, symbol, *price, weight, reason);
                Self::apply(state, &decision, self.cooldown_ticks);
                tracing::debug!(%symbol, %reason, %price, %weight, "Entry decision");
                return Ok(Some(decision));
            }
        }

        Ok(None)
    }

    fn apply(state: &mut SymbolState, decision: &Decision, cooldown_ticks: u64) {
        let previous = transition(&mut state.position, decision, state.ticks);
        state.rollback = Some(previous);
        if decision.reason.is_exit() {
            state.cooldown_until = state.ticks + 1 + cooldown_ticks;
        }
    }

    pub fn on_trade_executed(&mut self, execution: &Execution) {
        let window = self.window;
        let state = self
            .symbols
            .entry(execution.symbol.clone())
            .or_insert_with(|| SymbolState::new(window));
        reconcile(&mut state.position, execution, state.ticks);
        state.rollback = None;
    }

    pub fn on_order_rejected(&mut self, decision: &Decision) {
        if let Some(state) = self.symbols.get_mut(&decision.symbol) {
            if let Some(previous) = state.rollback.take() {
                tracing::debug!(symbol = %decision.symbol, reason = %decision.reason, "Rolling back rejected decision");
                state.position = previous;
                if decision.reason.is_exit() {
                    state.cooldown_until = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tick(i: i64, prices: &[(&str, Decimal)]) -> PriceUpdate {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(i);
        prices
            .iter()
            .fold(PriceUpdate::new(ts), |u, (s, p)| u.with_price(s, *p))
    }

    #[test]
    fn at_most_one_decision_and_exits_first() {
        let mut book = SymbolBook::new(3, 0);
        let guard = HiveGuard::default();

        // Tick 1: both symbols want to enter; only the lexically first gets it.
        let update = tick(1, &[("AAA", dec!(10)), ("BBB", dec!(20))]);
        let decision = book
            .decide(&update, &guard, |_, _, _| None, |_, _, _| Some((ReasonTag::ZScoreEntry, Decimal::ONE)))
            .unwrap()
            .unwrap();
        assert_eq!(decision.symbol, "AAA");
        assert!(book.get("BBB").unwrap().is_idle());
        assert_eq!(book.get("BBB").unwrap().window.len(), 1);

        // Tick 2: AAA wants out, BBB wants in; the exit wins.
        let update = tick(2, &[("AAA", dec!(11)), ("BBB", dec!(20))]);
        let decision = book
            .decide(
                &update,
                &guard,
                |_, _, _| Some(ReasonTag::TakeProfit),
                |_, _, _| Some((ReasonTag::ZScoreEntry, Decimal::ONE)),
            )
            .unwrap()
            .unwrap();
        assert_eq!(decision.symbol, "AAA");
        assert_eq!(decision.reason, ReasonTag::TakeProfit);
        assert!(book.get("AAA").unwrap().is_idle());
    }

    #[test]
    fn penalized_entry_tags_and_paused_symbols_are_skipped() {
        let mut book = SymbolBook::new(3, 0);
        let mut guard = HiveGuard::new(&[ReasonTag::RsiOversold]);
        guard.apply(&core_types::HiveSignal {
            paused_symbols: vec!["AAA".to_string()],
            ..Default::default()
        });

        let update = tick(1, &[("AAA", dec!(10)), ("BBB", dec!(20)), ("CCC", dec!(30))]);
        let decision = book
            .decide(&update, &guard, |_, _, _| None, |_, _, price| {
                if price == dec!(20) {
                    Some((ReasonTag::RsiOversold, Decimal::ONE))
                } else {
                    Some((ReasonTag::ZScoreEntry, Decimal::ONE))
                }
            })
            .unwrap()
            .unwrap();
        assert_eq!(decision.symbol, "CCC");
    }

    #[test]
    fn cooldown_blocks_reentry() {
        let mut book = SymbolBook::new(3, 2);
        let guard = HiveGuard::default();
        let enter = |_: &str, _: &mut SymbolState, _: Decimal| Some((ReasonTag::ZScoreEntry, Decimal::ONE));

        book.decide(&tick(1, &[("AAA", dec!(10))]), &guard, |_, _, _| None, enter).unwrap();
        let exit = book
            .decide(&tick(2, &[("AAA", dec!(10))]), &guard, |_, _, _| Some(ReasonTag::Timeout), enter)
            .unwrap();
        assert!(exit.is_some());

        // Exit on tick 2 with 2 cooldown ticks: ticks 3 and 4 are blocked.
        for i in 3..=4 {
            let d = book.decide(&tick(i, &[("AAA", dec!(10))]), &guard, |_, _, _| None, enter).unwrap();
            assert!(d.is_none(), "tick {i} should be cooling down");
        }
        let d = book.decide(&tick(5, &[("AAA", dec!(10))]), &guard, |_, _, _| None, enter).unwrap();
        assert!(d.is_some());
    }

    #[test]
    fn rejection_rolls_back_the_entry() {
        let mut book = SymbolBook::new(3, 0);
        let guard = HiveGuard::default();
        let decision = book
            .decide(
                &tick(1, &[("AAA", dec!(10))]),
                &guard,
                |_, _, _| None,
                |_, _, _| Some((ReasonTag::ZScoreEntry, Decimal::ONE)),
            )
            .unwrap()
            .unwrap();
        assert!(!book.get("AAA").unwrap().is_idle());

        book.on_order_rejected(&decision);
        assert!(book.get("AAA").unwrap().is_idle());
    }

    #[test]
    fn rejected_exit_stays_long_without_cooldown() {
        let mut book = SymbolBook::new(3, 2);
        let guard = HiveGuard::default();
        book.decide(
            &tick(1, &[("AAA", dec!(10))]),
            &guard,
            |_, _, _| None,
            |_, _, _| Some((ReasonTag::ZScoreEntry, Decimal::ONE)),
        )
        .unwrap();
        let exit = book
            .decide(&tick(2, &[("AAA", dec!(9))]), &guard, |_, _, _| Some(ReasonTag::StopLoss), |_, _, _| None)
            .unwrap()
            .unwrap();
        assert!(book.get("AAA").unwrap().in_cooldown());

        book.on_order_rejected(&exit);
        let state = book.get("AAA").unwrap();
        assert!(!state.is_idle());
        assert!(!state.in_cooldown());
        assert_eq!(state.long().unwrap().entry_price, dec!(10));
    }

    #[test]
    fn rejected_dca_add_restores_the_level() {
        let mut book = SymbolBook::new(3, 0);
        let guard = HiveGuard::default();
        let entry = book
            .decide(
                &tick(1, &[("AAA", dec!(10))]),
                &guard,
                |_, _, _| None,
                |_, _, _| Some((ReasonTag::DcaEntry, Decimal::ONE)),
            )
            .unwrap()
            .unwrap();
        book.on_trade_executed(&crate::test_support::fill(&entry));

        let add = book
            .decide(
                &tick(2, &[("AAA", dec!(9))]),
                &guard,
                |_, _, _| None,
                |_, _, _| Some((ReasonTag::DcaAdd, dec!(2))),
            )
            .unwrap()
            .unwrap();
        let long = book.get("AAA").unwrap().long().unwrap();
        assert_eq!((long.dca_level, long.last_fill_price), (1, dec!(9)));

        book.on_order_rejected(&add);
        let long = book.get("AAA").unwrap().long().unwrap();
        assert_eq!(long.dca_level, 0);
        assert_eq!(long.entry_price, dec!(10));
        assert_eq!(long.last_fill_price, dec!(10));
        assert_eq!(long.filled_quantity, dec!(1));
    }

    #[test]
    fn non_positive_price_is_an_error() {
        let mut book = SymbolBook::new(3, 0);
        let result = book.decide(
            &tick(1, &[("AAA", dec!(0))]),
            &HiveGuard::default(),
            |_, _, _| None,
            |_, _, _| None,
        );
        assert!(matches!(result, Err(StrategyError::InvalidInput(_))));
    }

    #[test]
    fn bad_price_leaves_other_windows_untouched() {
        let mut book = SymbolBook::new(3, 0);
        let guard = HiveGuard::default();
        book.decide(&tick(1, &[("AAA", dec!(10))]), &guard, |_, _, _| None, |_, _, _| None)
            .unwrap();

        let result = book.decide(
            &tick(2, &[("AAA", dec!(11)), ("BBB", dec!(-1))]),
            &guard,
            |_, _, _| None,
            |_, _, _| None,
        );
        assert!(result.is_err());
        let state = book.get("AAA").unwrap();
        assert_eq!((state.window.len(), state.ticks), (1, 1));
        assert!(book.get("BBB").is_none());
    }
}
