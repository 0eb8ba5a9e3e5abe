use crate::bollinger_rsi::BollingerRsi;
use crate::dca_grid::DcaGrid;
use crate::error::StrategyError;
use crate::regression_trend::RegressionTrend;
use crate::z_score_reversion::ZScoreReversion;
use crate::Strategy;
use configuration::Config;
use core_types::{ReasonTag, StrategyId};

/// Creates a new strategy instance based on the provided ID and configuration.
///
/// `hive_tags` seeds the strategy's penalized tags; callers normally pass
/// `config.hive.penalized_tags`. Parameters are validated here, so a bad parameter set
/// fails before any data is touched.
pub fn create_strategy(
    id: StrategyId,
    config: &Config,
    hive_tags: &[ReasonTag],
) -> Result<Box<dyn Strategy>, StrategyError> {
    // The compiler will error if a new StrategyId is added but not handled here.
    match id {
        StrategyId::ZScoreReversion => {
            let params = config.strategies.z_score_reversion.clone();
            Ok(Box::new(ZScoreReversion::new(params, hive_tags)?))
        }
        StrategyId::RegressionTrend => {
            let params = config.strategies.regression_trend.clone();
            Ok(Box::new(RegressionTrend::new(params, hive_tags)?))
        }
        StrategyId::BollingerRsi => {
            let params = config.strategies.bollinger_rsi.clone();
            Ok(Box::new(BollingerRsi::new(params, hive_tags)?))
        }
        StrategyId::DcaGrid => {
            let params = config.strategies.dca_grid.clone();
            Ok(Box::new(DcaGrid::new(params, hive_tags)?))
        }
    }
}
