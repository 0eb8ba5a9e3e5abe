use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::{DateTime, Utc};
use core_types::Trade;
use rust_decimal::prelude::*;
use std::time::Duration;

/// A stateless calculator for deriving performance metrics from trading activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - A slice of all completed `Trade`s from a trading session.
    /// * `equity_curve` - A time-series of the portfolio's value, one point per tick.
    /// * `initial_capital` - The starting capital of the trading session.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `PerformanceReport` or an `AnalyticsError`.
    pub fn calculate(
        &self,
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Result<PerformanceReport, AnalyticsError> {
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::NotEnoughData(
                "initial capital must be positive".to_string(),
            ));
        }

        let mut report = PerformanceReport::new();

        self.calculate_profitability(trades, &mut report);
        self.calculate_return(equity_curve, initial_capital, &mut report);
        self.calculate_drawdown(equity_curve, initial_capital, &mut report);
        self.calculate_ratios(equity_curve, &mut report)?;
        self.calculate_time_metrics(trades, &mut report);
        self.calculate_tag_breakdown(trades, &mut report);

        Ok(report)
    }

    /// Calculates all profitability-related metrics. P&L is net of fees.
    fn calculate_profitability(&self, trades: &[Trade], report: &mut PerformanceReport) {
        report.total_trades = trades.len();

        for trade in trades {
            let pnl = trade.net_profit();
            report.total_net_profit += pnl;
            report.total_fees += trade.fees;

            if trade.is_win() {
                report.gross_profit += pnl;
                report.winning_trades += 1;
            } else {
                report.gross_loss += pnl.abs();
                report.losing_trades += 1;
            }
        }

        // --- Ratios ---
        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = Some(report.gross_profit / report.gross_loss);
        }

        if report.total_trades > 0 {
            report.win_rate_pct = Some(
                Decimal::from(report.winning_trades) / Decimal::from(report.total_trades) * Decimal::ONE_HUNDRED,
            );
        }

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }

        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
            if report.average_loss > Decimal::ZERO {
                report.payoff_ratio = Some(report.average_win / report.average_loss);
            }
        }
    }

    /// Return on the final equity point, which includes positions still open. Without an
    /// equity curve the realized net profit is used.
    fn calculate_return(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        let final_equity = equity_curve
            .last()
            .map_or(initial_capital + report.total_net_profit, |(_, equity)| *equity);
        report.total_return_pct = (final_equity - initial_capital) / initial_capital * Decimal::ONE_HUNDRED;
    }

    /// Calculates maximum drawdown from the equity curve, starting from the initial capital.
    fn calculate_drawdown(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
        report: &mut PerformanceReport,
    ) {
        let mut peak_equity = initial_capital;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for &(_timestamp, equity) in equity_curve {
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = peak_equity - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
            if peak_equity > Decimal::ZERO {
                max_drawdown_pct = max_drawdown_pct.max(drawdown / peak_equity * Decimal::ONE_HUNDRED);
            }
        }

        report.max_drawdown = max_drawdown;
        report.max_drawdown_pct = max_drawdown_pct;
    }

    /// Calculates all ratio-based metrics like Sharpe and Calmar.
    fn calculate_ratios(
        &self,
        equity_curve: &[(DateTime<Utc>, Decimal)],
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        // --- Calmar Ratio ---
        if report.max_drawdown_pct > Decimal::ZERO {
            report.calmar_ratio = Some(report.total_return_pct / report.max_drawdown_pct);
        }

        // --- Sharpe Ratio ---
        // 1. Per-tick returns.
        let returns: Vec<Decimal> = equity_curve
            .windows(2)
            .filter(|w| !w[0].1.is_zero())
            .map(|w| (w[1].1 - w[0].1) / w[0].1)
            .collect();

        if returns.len() < 2 {
            return Ok(());
        }

        // 2. Mean and population variance of returns.
        let count = Decimal::from(returns.len());
        let mean_return = returns.iter().sum::<Decimal>() / count;
        let variance = returns
            .iter()
            .map(|r| (*r - mean_return) * (*r - mean_return))
            .sum::<Decimal>()
            / count;

        if variance <= Decimal::ZERO {
            return Ok(());
        }

        let std_dev = variance
            .sqrt()
            .ok_or_else(|| AnalyticsError::InternalError("Failed to calculate square root for variance".to_string()))?;

        // 3. Per-period Sharpe with a zero risk-free rate. Tick spacing is not fixed, so
        // it is not annualized.
        if std_dev > Decimal::ZERO {
            report.sharpe_ratio = Some(mean_return / std_dev);
        }

        Ok(())
    }

    /// Calculates time-based metrics.
    fn calculate_time_metrics(&self, trades: &[Trade], report: &mut PerformanceReport) {
        if trades.is_empty() {
            return;
        }

        let total_secs: i64 = trades
            .iter()
            .map(|t| (t.exit_time - t.entry_time).num_seconds().max(0))
            .sum();
        let avg_secs = total_secs / trades.len() as i64;
        report.average_holding_period = Duration::from_secs(avg_secs.unsigned_abs());
    }

    fn calculate_tag_breakdown(&self, trades: &[Trade], report: &mut PerformanceReport) {
        for trade in trades {
            let pnl = trade.net_profit();
            let win = trade.is_win();
            for tag in [trade.entry_reason, trade.exit_reason] {
                let stats = report.tag_breakdown.entry(tag).or_default();
                stats.trades += 1;
                stats.net_profit += pnl;
                if win {
                    stats.wins += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use core_types::ReasonTag;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::minutes(minutes)
    }

    fn trade(entry: Decimal, exit: Decimal, held: i64, entry_reason: ReasonTag, exit_reason: ReasonTag) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            entry_time: t(0),
            exit_time: t(held),
            entry_price: entry,
            exit_price: exit,
            quantity: dec!(1),
            fees: dec!(0),
            entry_reason,
            exit_reason,
            fills: 1,
        }
    }

    #[test]
    fn profitability_and_ratios() {
        let trades = vec![
            trade(dec!(100), dec!(120), 10, ReasonTag::ZScoreEntry, ReasonTag::TakeProfit),
            trade(dec!(100), dec!(90), 20, ReasonTag::ZScoreEntry, ReasonTag::StopLoss),
            trade(dec!(100), dec!(110), 30, ReasonTag::RsiOversold, ReasonTag::TakeProfit),
        ];
        let curve = vec![
            (t(0), dec!(1000)),
            (t(1), dec!(1020)),
            (t(2), dec!(1010)),
            (t(3), dec!(1020)),
        ];

        let report = AnalyticsEngine::new().calculate(&trades, &curve, dec!(1000)).unwrap();

        assert_eq!(report.total_trades, 3);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.total_net_profit, dec!(20));
        assert_eq!(report.gross_profit, dec!(30));
        assert_eq!(report.gross_loss, dec!(10));
        assert_eq!(report.profit_factor, Some(dec!(3)));
        assert_eq!(report.average_win, dec!(15));
        assert_eq!(report.payoff_ratio, Some(dec!(1.5)));
        assert_eq!(report.total_return_pct, dec!(2));
        assert_eq!(report.max_drawdown, dec!(10));
        assert!(report.sharpe_ratio.is_some());
        assert!(report.calmar_ratio.unwrap() > dec!(0));
        assert_eq!(report.average_holding_period, Duration::from_secs(20 * 60));
    }

    #[test]
    fn tag_breakdown_counts_entry_and_exit_tags() {
        let trades = vec![
            trade(dec!(100), dec!(120), 1, ReasonTag::ZScoreEntry, ReasonTag::TakeProfit),
            trade(dec!(100), dec!(90), 1, ReasonTag::ZScoreEntry, ReasonTag::StopLoss),
        ];
        let report = AnalyticsEngine::new().calculate(&trades, &[], dec!(1000)).unwrap();

        let entry = report.tag(ReasonTag::ZScoreEntry);
        assert_eq!((entry.trades, entry.wins, entry.net_profit), (2, 1, dec!(10)));
        assert_eq!(report.tag(ReasonTag::StopLoss).losses(), 1);
        assert_eq!(report.tag(ReasonTag::DcaAdd).trades, 0);
    }

    #[test]
    fn no_trades_still_measures_the_curve() {
        let curve = vec![(t(0), dec!(1000)), (t(1), dec!(950)), (t(2), dec!(980))];
        let report = AnalyticsEngine::new().calculate(&[], &curve, dec!(1000)).unwrap();
        assert_eq!(report.total_trades, 0);
        assert_eq!(report.win_rate_pct, None);
        assert_eq!(report.max_drawdown_pct, dec!(5));
        assert_eq!(report.total_return_pct, dec!(-2));
    }

    #[test]
    fn report_serializes_holding_period_as_human_time() {
        let mut report = PerformanceReport::new();
        report.average_holding_period = Duration::from_secs(90 * 60);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["average_holding_period"], "1h 30m");
    }
}
