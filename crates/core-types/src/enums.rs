use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Identifies one of the strategy families. Every concrete variant is a
/// parameter set for one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    ZScoreReversion,
    RegressionTrend,
    BollingerRsi,
    DcaGrid,
}

impl StrategyId {
    pub const ALL: [StrategyId; 4] = [
        StrategyId::ZScoreReversion,
        StrategyId::RegressionTrend,
        StrategyId::BollingerRsi,
        StrategyId::DcaGrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::ZScoreReversion => "z-score-reversion",
            StrategyId::RegressionTrend => "regression-trend",
            StrategyId::BollingerRsi => "bollinger-rsi",
            StrategyId::DcaGrid => "dca-grid",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = CoreError;

    /// Accepts both the kebab-case CLI spelling and the snake_case config spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        StrategyId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownStrategy(s.to_string()))
    }
}

/// The reason attached to every decision. The hive scorer keeps penalties per tag,
/// so these strings are part of the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    // Entries
    ZScoreEntry,
    RsiOversold,
    RegressionBreakout,
    BollingerBounce,
    DcaEntry,
    DcaAdd,
    // Exits
    TakeProfit,
    StopLoss,
    TrailingStop,
    Timeout,
    MeanReverted,
    TrendReversal,
}

impl ReasonTag {
    pub const ALL: [ReasonTag; 12] = [
        ReasonTag::ZScoreEntry,
        ReasonTag::RsiOversold,
        ReasonTag::RegressionBreakout,
        ReasonTag::BollingerBounce,
        ReasonTag::DcaEntry,
        ReasonTag::DcaAdd,
        ReasonTag::TakeProfit,
        ReasonTag::StopLoss,
        ReasonTag::TrailingStop,
        ReasonTag::Timeout,
        ReasonTag::MeanReverted,
        ReasonTag::TrendReversal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::ZScoreEntry => "z_score_entry",
            ReasonTag::RsiOversold => "rsi_oversold",
            ReasonTag::RegressionBreakout => "regression_breakout",
            ReasonTag::BollingerBounce => "bollinger_bounce",
            ReasonTag::DcaEntry => "dca_entry",
            ReasonTag::DcaAdd => "dca_add",
            ReasonTag::TakeProfit => "take_profit",
            ReasonTag::StopLoss => "stop_loss",
            ReasonTag::TrailingStop => "trailing_stop",
            ReasonTag::Timeout => "timeout",
            ReasonTag::MeanReverted => "mean_reverted",
            ReasonTag::TrendReversal => "trend_reversal",
        }
    }

    /// Exit tags close a position; everything else opens or adds to one.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            ReasonTag::TakeProfit
                | ReasonTag::StopLoss
                | ReasonTag::TrailingStop
                | ReasonTag::Timeout
                | ReasonTag::MeanReverted
                | ReasonTag::TrendReversal
        )
    }
}

impl fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonTag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ReasonTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == normalized)
            .ok_or_else(|| CoreError::UnknownReasonTag(s.to_string()))
    }
}
