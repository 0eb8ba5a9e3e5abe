use core_types::ReasonTag;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Trade statistics for a single reason tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagStats {
    pub trades: usize,
    pub wins: usize,
    pub net_profit: Decimal,
}

impl TagStats {
    pub fn losses(&self) -> usize {
        self.trades - self.wins
    }
}

/// A comprehensive, standardized report of a strategy's performance.
///
/// This struct is the final output of the `AnalyticsEngine` and serves as the
/// data transfer object for performance results throughout the entire system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Core Profitability Metrics
    pub total_net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: Option<Decimal>, // None when there are no losing trades
    pub total_return_pct: Decimal,

    // II. Risk and Drawdown
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub sharpe_ratio: Option<Decimal>, // None when returns have no variance
    pub calmar_ratio: Option<Decimal>, // None when there is no drawdown

    // III. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Option<Decimal>, // None for 0 trades
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub payoff_ratio: Option<Decimal>, // None when average loss is 0
    pub total_fees: Decimal,

    // IV. Time-Based Metrics
    #[serde(with = "humantime_serde")]
    pub average_holding_period: Duration,

    // V. Reason Tags
    /// Every trade is counted under its entry tag and under its exit tag. The two tag
    /// sets are disjoint, so one map holds both.
    #[serde(default)]
    pub tag_breakdown: BTreeMap<ReasonTag, TagStats>,
}

impl PerformanceReport {
    /// Creates a new, zeroed-out PerformanceReport.
    pub fn new() -> Self {
        Self {
            total_net_profit: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: None,
            total_return_pct: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: None,
            calmar_ratio: None,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate_pct: None,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            payoff_ratio: None,
            total_fees: Decimal::ZERO,
            average_holding_period: Duration::ZERO,
            tag_breakdown: BTreeMap::new(),
        }
    }

    /// Stats for trades that entered with `tag`, or exited with it.
    pub fn tag(&self, tag: ReasonTag) -> TagStats {
        self.tag_breakdown.get(&tag).cloned().unwrap_or_default()
    }
}

impl Default for PerformanceReport {
    fn default() -> Self {
        Self::new()
    }
}
