use crate::error::OptimizerError;
use configuration::optimizer_config::ParameterRange;
use configuration::Config;
use core_types::StrategyId;
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One point of the parameter space: dotted parameter name to value.
pub type ParameterSet = BTreeMap<String, Value>;

/// Generates every unique combination of parameters from the defined parameter space.
pub fn generate_parameter_sets(
    space: &BTreeMap<String, ParameterRange>,
) -> Result<Vec<ParameterSet>, OptimizerError> {
    if space.is_empty() {
        return Ok(vec![ParameterSet::new()]);
    }

    // 1. Convert all parameter ranges into concrete lists of values.
    let mut names = Vec::with_capacity(space.len());
    let mut value_lists = Vec::with_capacity(space.len());
    for (name, range) in space {
        let values = expand_range(name, range)?;
        if values.is_empty() {
            return Err(OptimizerError::ParameterGeneration(format!(
                "Range for '{}' produces no values.",
                name
            )));
        }
        names.push(name.clone());
        value_lists.push(values);
    }

    // 2. Use itertools::multi_cartesian_product to generate all combinations.
    let combinations = value_lists
        .into_iter()
        .multi_cartesian_product()
        .map(|product| names.iter().cloned().zip(product).collect())
        .collect();

    Ok(combinations)
}

fn expand_range(name: &str, range: &ParameterRange) -> Result<Vec<Value>, OptimizerError> {
    let values = match range {
        ParameterRange::DiscreteInt(vals) => vals.iter().map(|&v| json!(v)).collect(),
        ParameterRange::DiscreteDecimal(vals) => vals.iter().map(|v| json!(v)).collect(),
        ParameterRange::LinearInt { start, end, step } => {
            if *step <= 0 {
                return Err(OptimizerError::ParameterGeneration(format!(
                    "Step for '{}' must be positive.",
                    name
                )));
            }
            (*start..=*end).step_by(*step as usize).map(|v| json!(v)).collect()
        }
        ParameterRange::LinearDecimal { start, end, step } => {
            if *step <= Decimal::ZERO {
                return Err(OptimizerError::ParameterGeneration(format!(
                    "Step for '{}' must be positive.",
                    name
                )));
            }
            let mut vals = Vec::new();
            let mut current = *start;
            while current <= *end {
                vals.push(json!(current.normalize()));
                current += *step;
            }
            vals
        }
    };
    Ok(values)
}

/// A short human-readable label for a parameter set, e.g. `entry_z=2, window=20`.
pub fn describe(set: &ParameterSet) -> String {
    set.iter()
        .map(|(name, value)| match value {
            Value::String(s) => format!("{name}={s}"),
            other => format!("{name}={other}"),
        })
        .join(", ")
}

/// Returns a copy of `base` with the parameter set applied to the parameters of
/// `strategy_id`. Every name must address an existing field.
pub fn apply_parameter_set(
    base: &Config,
    strategy_id: StrategyId,
    set: &ParameterSet,
) -> Result<Config, OptimizerError> {
    let mut config = base.clone();
    let strategies = &mut config.strategies;
    match strategy_id {
        StrategyId::ZScoreReversion => {
            strategies.z_score_reversion = overlay(&strategies.z_score_reversion, set)?
        }
        StrategyId::RegressionTrend => {
            strategies.regression_trend = overlay(&strategies.regression_trend, set)?
        }
        StrategyId::BollingerRsi => {
            strategies.bollinger_rsi = overlay(&strategies.bollinger_rsi, set)?
        }
        StrategyId::DcaGrid => strategies.dca_grid = overlay(&strategies.dca_grid, set)?,
    }
    Ok(config)
}

fn overlay<T>(params: &T, set: &ParameterSet) -> Result<T, OptimizerError>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(params)?;
    for (name, new_value) in set {
        let slot = name
            .split('.')
            .try_fold(&mut value, |node, key| node.get_mut(key))
            .ok_or_else(|| OptimizerError::UnknownParameter(name.clone()))?;
        *slot = new_value.clone();
    }
    Ok(serde_json::from_value(value)?)
}
