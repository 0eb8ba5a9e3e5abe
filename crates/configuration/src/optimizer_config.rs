use core_types::StrategyId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Defines a parameter sweep. This is deserialized from a `sweep.toml` file.
///
/// Parameter names address fields of the strategy's parameter struct; nested fields
/// use dots, e.g. `exit.take_profit_pct`.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub strategy_id: StrategyId,
    pub parameter_space: BTreeMap<String, ParameterRange>,
    #[serde(default)] // Use default values if the [analysis] section is missing
    pub analysis: AnalysisConfig,
}

/// Configuration for the analysis and ranking of sweep results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    /// Hard filters to discard unacceptable runs before scoring.
    #[serde(default)]
    pub filters: Filters,
    /// Weights for the multi-objective scoring function.
    #[serde(default)]
    pub scoring_weights: Weights,
}

/// Hard filters to apply to the set of performance reports.
#[derive(Debug, Clone, Deserialize)]
pub struct Filters {
    pub min_total_trades: usize,
    pub max_drawdown_pct: Decimal,
}

/// Weights for the scoring function. The positive weights should sum to 1.0;
/// the hive penalty weight is subtracted.
#[derive(Debug, Clone, Deserialize)]
pub struct Weights {
    pub weight_profit_factor: Decimal,
    pub weight_calmar_ratio: Decimal,
    pub weight_payoff_ratio: Decimal,
    #[serde(default)]
    pub weight_hive_penalty: Decimal,
}

// --- Default Implementations ---
// This allows a user to omit the `[analysis]` section from their toml
// and still have it work with sensible defaults.

impl Default for Filters {
    fn default() -> Self {
        Self {
            min_total_trades: 5,
            max_drawdown_pct: dec!(25),
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            weight_profit_factor: dec!(0.4),
            weight_calmar_ratio: dec!(0.4),
            weight_payoff_ratio: dec!(0.2),
            weight_hive_penalty: dec!(0.1),
        }
    }
}

/// Represents a range of values for a single parameter to be tested.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParameterRange {
    DiscreteInt(Vec<i64>),
    DiscreteDecimal(Vec<Decimal>),
    LinearInt { start: i64, end: i64, step: i64 },
    LinearDecimal { start: Decimal, end: Decimal, step: Decimal },
}
