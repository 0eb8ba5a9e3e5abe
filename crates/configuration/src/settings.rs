use crate::error::ConfigError;
use core_types::ReasonTag;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: Simulation,
    pub risk_management: RiskManagement,
    #[serde(default)]
    pub hive: HiveSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    pub strategies: Strategies,
}

impl Config {
    /// Checks the cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.initial_capital <= Decimal::ZERO {
            return Err(invalid("simulation.initial_capital must be positive"));
        }
        if sim.taker_fee_pct < Decimal::ZERO || sim.taker_fee_pct >= Decimal::ONE {
            return Err(invalid("simulation.taker_fee_pct must be in [0, 1)"));
        }
        if sim.slippage_pct < Decimal::ZERO || sim.slippage_pct >= Decimal::ONE {
            return Err(invalid("simulation.slippage_pct must be in [0, 1)"));
        }

        let risk = &self.risk_management;
        if risk.risk_per_trade_pct <= Decimal::ZERO || risk.risk_per_trade_pct > Decimal::ONE {
            return Err(invalid("risk_management.risk_per_trade_pct must be in (0, 1]"));
        }
        if risk.max_position_pct <= Decimal::ZERO || risk.max_position_pct > Decimal::ONE {
            return Err(invalid("risk_management.max_position_pct must be in (0, 1]"));
        }

        if self.hive.penalty_threshold <= Decimal::ZERO {
            return Err(invalid("hive.penalty_threshold must be positive"));
        }
        if self.hive.decay < Decimal::ZERO || self.hive.decay > Decimal::ONE {
            return Err(invalid("hive.decay must be in [0, 1]"));
        }
        if let Some((tag, _)) = self.hive.tag_weights.iter().find(|(_, w)| **w < Decimal::ZERO) {
            return Err(ConfigError::ValidationError(format!(
                "hive.tag_weights.{tag} must not be negative"
            )));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

/// Contains parameters for the simulated exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// The initial starting capital for the simulation, in quote currency.
    pub initial_capital: Decimal,

    /// The trading fees charged by the exchange for a "taker" order.
    /// 0.001 corresponds to 0.1%.
    pub taker_fee_pct: Decimal,

    /// The assumed price slippage for market orders, as a fraction of the price.
    /// Buys fill higher and sells fill lower by this amount.
    pub slippage_pct: Decimal,
}

/// Contains parameters for trade-level risk management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskManagement {
    /// The fraction of total portfolio equity committed to a base-size entry (e.g., 0.1 for 10%).
    pub risk_per_trade_pct: Decimal,
    /// Upper bound on the exposure of a single symbol as a fraction of equity.
    pub max_position_pct: Decimal,
    /// Fraction of cash that is never spent, to leave room for fees.
    #[serde(default = "default_cash_buffer")]
    pub cash_buffer_pct: Decimal,
}

fn default_cash_buffer() -> Decimal {
    dec!(0.05)
}

/// Settings for the hive penalty scorer and the strategy-side guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveSettings {
    /// Tags the strategies must not enter with from the very first tick.
    #[serde(default)]
    pub penalized_tags: Vec<ReasonTag>,
    /// Accumulated penalty at which a tag gets penalized.
    #[serde(default = "default_penalty_threshold")]
    pub penalty_threshold: Decimal,
    /// Factor in [0, 1] a winning trade multiplies each of its tags' penalty by.
    #[serde(default = "default_decay")]
    pub decay: Decimal,
    /// Per-tag weight of a losing trade; tags not listed weigh 1.
    #[serde(default)]
    pub tag_weights: BTreeMap<ReasonTag, Decimal>,
}

fn default_penalty_threshold() -> Decimal {
    dec!(5)
}

fn default_decay() -> Decimal {
    dec!(0.5)
}

impl Default for HiveSettings {
    fn default() -> Self {
        Self {
            penalized_tags: Vec::new(),
            penalty_threshold: default_penalty_threshold(),
            decay: default_decay(),
            tag_weights: BTreeMap::new(),
        }
    }
}

/// Logging output. `RUST_LOG` always wins over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "hive.log".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Contains the parameter sets for all available strategies.
#[derive(Debug, Deserialize, Clone)]
pub struct Strategies {
    pub z_score_reversion: ZScoreReversionParams,
    pub regression_trend: RegressionTrendParams,
    pub bollinger_rsi: BollingerRsiParams,
    pub dca_grid: DcaGridParams,
}

/// How an open position is closed. Percentages are fractions of the average entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExitParams {
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    /// Distance from the peak price since entry; only armed once the position is in profit.
    #[serde(default)]
    pub trailing_stop_pct: Option<Decimal>,
    /// Close the position after this many ticks regardless of price.
    #[serde(default)]
    pub max_hold_ticks: Option<u64>,
    /// Ticks a symbol must wait after an exit before it can be entered again.
    #[serde(default)]
    pub cooldown_ticks: u64,
}

/// Parameters for the Z-score mean reversion family.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ZScoreReversionParams {
    pub window: usize,
    /// Entry when z <= -entry_z.
    pub entry_z: Decimal,
    /// Exit when z >= exit_z.
    pub exit_z: Decimal,
    #[serde(default)]
    pub rsi_filter: bool,
    pub rsi_period: usize,
    pub rsi_oversold: Decimal,
    pub exit: ExitParams,
}

/// Parameters for the linear-regression trend follower.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RegressionTrendParams {
    pub window: usize,
    /// Minimum fitted slope per tick, relative to the fitted mean (0.001 = 0.1% per tick).
    pub min_slope_pct: Decimal,
    pub min_r_squared: Decimal,
    /// Period of the EMA trend filter; price must be above it to enter.
    pub ema_period: usize,
    pub exit: ExitParams,
}

/// Parameters for the Bollinger band bounce with RSI and ATR filters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BollingerRsiParams {
    pub window: usize,
    pub bb_std_dev: Decimal,
    pub rsi_period: usize,
    pub rsi_oversold: Decimal,
    pub atr_period: usize,
    /// Skip entries while ATR / price is above this (too volatile).
    pub max_atr_pct: Decimal,
    /// Widen the stop to this many ATRs below entry when that is further than `stop_loss_pct`.
    pub atr_stop_mult: Decimal,
    pub exit: ExitParams,
}

/// Parameters for the DCA grid: enter on a dip, average down on further drops.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DcaGridParams {
    pub window: usize,
    pub entry_z: Decimal,
    /// Drop below the last fill that triggers the next level (0.02 = 2%).
    pub dca_step_pct: Decimal,
    pub max_dca_levels: u32,
    /// Size of level n is `size_multiplier^n` times the base size.
    pub size_multiplier: Decimal,
    pub exit: ExitParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        let toml = r#"
            [simulation]
            initial_capital = 10000
            taker_fee_pct = 0.001
            slippage_pct = 0.0005

            [risk_management]
            risk_per_trade_pct = 0.1
            max_position_pct = 0.3

            [hive]
            penalized_tags = ["timeout"]
            [hive.tag_weights]
            stop_loss = 2.5

            [strategies.z_score_reversion]
            window = 20
            entry_z = 2.0
            exit_z = 0.0
            rsi_filter = true
            rsi_period = 14
            rsi_oversold = 30
            exit = { take_profit_pct = 0.02, stop_loss_pct = 0.03, max_hold_ticks = 50 }

            [strategies.regression_trend]
            window = 30
            min_slope_pct = 0.001
            min_r_squared = 0.7
            ema_period = 50
            exit = { take_profit_pct = 0.05, stop_loss_pct = 0.02, trailing_stop_pct = 0.015 }

            [strategies.bollinger_rsi]
            window = 20
            bb_std_dev = 2.0
            rsi_period = 14
            rsi_oversold = 30
            atr_period = 14
            max_atr_pct = 0.02
            atr_stop_mult = 2.0
            exit = { take_profit_pct = 0.03, stop_loss_pct = 0.02 }

            [strategies.dca_grid]
            window = 20
            entry_z = 1.5
            dca_step_pct = 0.02
            max_dca_levels = 3
            size_multiplier = 1.5
            exit = { take_profit_pct = 0.015, stop_loss_pct = 0.08, max_hold_ticks = 500 }
        "#;
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn parses_full_config_with_defaults() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert_eq!(config.hive.penalized_tags, vec![ReasonTag::Timeout]);
        assert_eq!(config.hive.tag_weights.get(&ReasonTag::StopLoss), Some(&dec!(2.5)));
        assert_eq!(config.hive.penalty_threshold, dec!(5));
        assert_eq!(config.risk_management.cash_buffer_pct, dec!(0.05));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.strategies.z_score_reversion.exit.max_hold_ticks, Some(50));
        assert_eq!(config.strategies.z_score_reversion.exit.cooldown_ticks, 0);
        assert_eq!(
            config.strategies.regression_trend.exit.trailing_stop_pct,
            Some(dec!(0.015))
        );
    }

    #[test]
    fn rejects_out_of_range_fee() {
        let mut config = sample();
        config.simulation.taker_fee_pct = dec!(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_negative_tag_weight() {
        let mut config = sample();
        config.hive.tag_weights.insert(ReasonTag::Timeout, dec!(-1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("timeout")
        ));

        config.hive.tag_weights.insert(ReasonTag::Timeout, Decimal::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_penalty_threshold() {
        let mut config = sample();
        config.hive.penalty_threshold = Decimal::ZERO;
        assert!(config.validate().is_err());
    }
}
