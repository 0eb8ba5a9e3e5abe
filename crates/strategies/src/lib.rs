//! # Hive Strategy Library
//!
//! This crate contains the trading logic. It defines a universal `Strategy` trait and
//! four strategy families; every concrete variant is one family plus a parameter set.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O. It depends only on `core-types`, `indicators` and
//!   `configuration`.
//! - **One Decision Per Tick:** `SymbolBook` owns the per-symbol windows and position
//!   state machines and runs the shared tick loop, so each family only supplies an
//!   exit rule and an entry rule.
//! - **Hive Feedback:** Penalized reason tags and paused symbols arrive through
//!   `on_hive_signal` and are enforced by `HiveGuard` on entries.
//!
//! ## Public API
//!
//! - `Strategy`: The core trait all strategies implement.
//! - `create_strategy`: The factory function to construct a strategy instance.
//! - The concrete strategy structs themselves (e.g., `ZScoreReversion`).

// Declare all the modules that constitute this crate.
pub mod bollinger_rsi;
pub mod book;
pub mod dca_grid;
pub mod error;
pub mod factory;
pub mod hive;
pub mod position;
pub mod regression_trend;
pub mod z_score_reversion;

// Re-export the key components to create a clean, public-facing API.
pub use bollinger_rsi::BollingerRsi;
pub use book::{SymbolBook, SymbolState};
pub use dca_grid::DcaGrid;
pub use error::StrategyError;
pub use factory::create_strategy;
pub use hive::HiveGuard;
pub use position::{ExitPolicy, LongPosition, PositionState};
pub use regression_trend::RegressionTrend;
pub use z_score_reversion::ZScoreReversion;

pub use core_types::StrategyId;

use configuration::ExitParams;
use core_types::{Decision, Execution, HiveSignal, PriceUpdate};
use rust_decimal::prelude::*;

/// The core trait that all trading strategies must implement.
///
/// The `&mut self` in the callbacks is crucial, as every strategy keeps per-symbol
/// windows and position state. The `Send + Sync` bounds allow strategies to be moved
/// into the optimizer's rayon workers.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Evaluates the strategy on a new tick.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Decision))` - at most one decision for the whole tick.
    /// * `Ok(None)` - nothing to do on this tick.
    /// * `Err(StrategyError)` - the tick could not be evaluated.
    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Option<Decision>, StrategyError>;

    /// Called for every fill of an order that originated from this strategy.
    fn on_trade_executed(&mut self, _execution: &Execution) {}

    /// Called when a decision could not be turned into an order.
    fn on_order_rejected(&mut self, _decision: &Decision) {}

    /// Called whenever the hive scorer changes its verdict.
    fn on_hive_signal(&mut self, _signal: &HiveSignal) {}
}

/// Converts a `Decimal` parameter to `f64` for indicator comparisons.
pub(crate) fn param_f64(value: Decimal, name: &str) -> Result<f64, StrategyError> {
    value
        .to_f64()
        .ok_or_else(|| StrategyError::InvalidParameters(format!("{} is not representable as f64", name)))
}

pub(crate) fn validate_exit(exit: &ExitParams) -> Result<(), StrategyError> {
    if exit.take_profit_pct <= Decimal::ZERO {
        return Err(StrategyError::InvalidParameters(
            "exit.take_profit_pct must be positive".to_string(),
        ));
    }
    if exit.stop_loss_pct <= Decimal::ZERO || exit.stop_loss_pct >= Decimal::ONE {
        return Err(StrategyError::InvalidParameters(
            "exit.stop_loss_pct must be in (0, 1)".to_string(),
        ));
    }
    if let Some(trail) = exit.trailing_stop_pct {
        if trail <= Decimal::ZERO || trail >= Decimal::ONE {
            return Err(StrategyError::InvalidParameters(
                "exit.trailing_stop_pct must be in (0, 1)".to_string(),
            ));
        }
    }
    if exit.max_hold_ticks == Some(0) {
        return Err(StrategyError::InvalidParameters(
            "exit.max_hold_ticks must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_window(window: usize, minimum: usize) -> Result<(), StrategyError> {
    if window < minimum {
        return Err(StrategyError::InvalidParameters(format!(
            "window must be at least {}, got {}",
            minimum, window
        )));
    }
    Ok(())
}
