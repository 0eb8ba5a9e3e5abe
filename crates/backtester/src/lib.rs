//! # Hive Backtester
//!
//! Replays a tick series through one strategy and wires every other component around it:
//! decision → risk sizing → simulated execution → portfolio → strategy callbacks → hive
//! scoring → equity point.
//!
//! ## Public API
//!
//! - `Backtester`: The event loop.
//! - `BacktestResult`: Report, trades, equity curve and hive signals of one run.
//! - `data::load_ticks`: CSV tick loading.

pub mod data;
pub mod error;

pub use error::BacktestError;

use analytics::{AnalyticsEngine, HiveScorer, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::Config;
use core_types::{Decision, HiveSignal, Position, PriceUpdate, StrategyId, Trade};
use executor::{Executor, Portfolio, SimulatedExecutor};
use indicatif::{ProgressBar, ProgressStyle};
use risk::{PortfolioSnapshot, RiskManager, SimpleRiskManager};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use strategies::Strategy;

/// Everything one backtest run produced.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub strategy: String,
    pub report: PerformanceReport,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    pub hive_signals: Vec<HiveSignal>,
    /// Total tag penalty accumulated by the hive scorer over the run.
    pub hive_penalty: Decimal,
    /// Positions still open after the last tick. They are marked to market in the
    /// equity curve but do not appear in `trades`.
    pub open_positions: Vec<Position>,
    pub rejected_decisions: usize,
}

/// The main backtesting engine.
pub struct Backtester {
    // --- Context ---
    initial_capital: Decimal,
    show_progress: bool,
    // --- Components ---
    portfolio: Portfolio,
    strategy: Box<dyn Strategy>,
    risk_manager: Box<dyn RiskManager>,
    executor: Box<dyn Executor>,
    analytics_engine: AnalyticsEngine,
    scorer: HiveScorer,
}

impl Backtester {
    pub fn new(
        initial_capital: Decimal,
        strategy: Box<dyn Strategy>,
        risk_manager: Box<dyn RiskManager>,
        executor: Box<dyn Executor>,
        scorer: HiveScorer,
    ) -> Self {
        Self {
            initial_capital,
            show_progress: false,
            portfolio: Portfolio::new(initial_capital),
            strategy,
            risk_manager,
            executor,
            analytics_engine: AnalyticsEngine::new(),
            scorer,
        }
    }

    /// Builds a backtester with the simulated executor and simple risk manager for
    /// `id`, all parameterized from `config`.
    pub fn from_config(id: StrategyId, config: &Config) -> Result<Self, BacktestError> {
        let strategy = strategies::create_strategy(id, config, &config.hive.penalized_tags)?;
        let risk_manager = SimpleRiskManager::new(config.risk_management.clone())?;
        let executor = SimulatedExecutor::new(config.simulation.clone());
        let scorer = HiveScorer::new(&config.hive)?;
        Ok(Self::new(
            config.simulation.initial_capital,
            strategy,
            Box::new(risk_manager),
            Box::new(executor),
            scorer,
        ))
    }

    /// Shows an `indicatif` progress bar while running. Off by default so parallel
    /// sweeps stay quiet.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar, BacktestError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );
        Ok(bar)
    }

    fn snapshot(&self, prices: &BTreeMap<String, Decimal>) -> PortfolioSnapshot {
        PortfolioSnapshot {
            cash: self.portfolio.cash(),
            total_equity: self.portfolio.total_equity(prices),
            positions: self.portfolio.positions().cloned().collect(),
        }
    }

    /// Runs the simulation over `ticks`, which must be in time order.
    pub fn run(&mut self, ticks: &[PriceUpdate]) -> Result<BacktestResult, BacktestError> {
        if ticks.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }

        tracing::info!(strategy = self.strategy.name(), ticks = ticks.len(), "Starting backtest");

        let mut equity_curve = Vec::with_capacity(ticks.len());
        let mut trades = Vec::new();
        let mut hive_signals = Vec::new();
        let mut rejected_decisions = 0;
        // Last known price of every symbol; ticks may quote only some of them.
        let mut last_prices: BTreeMap<String, Decimal> = BTreeMap::new();

        let progress_bar = self.progress_bar(ticks.len())?;

        for tick in ticks {
            last_prices.extend(tick.prices.iter().map(|(s, p)| (s.clone(), *p)));

            // --- 1. STRATEGY EVALUATION ---
            if let Some(decision) = self.strategy.on_price_update(tick)? {
                // --- 2. SIZING, EXECUTION AND BOOKKEEPING ---
                match self.process(&decision, tick.timestamp, &last_prices) {
                    Ok(Some(trade)) => {
                        // --- 3. HIVE SCORING ---
                        if let Some(signal) = self.scorer.record(&trade) {
                            self.strategy.on_hive_signal(&signal);
                            hive_signals.push(signal);
                        }
                        trades.push(trade);
                    }
                    Ok(None) => {}
                    Err(error) => {
                        tracing::warn!(
                            symbol = %decision.symbol,
                            side = %decision.side,
                            reason = %decision.reason,
                            %error,
                            "Decision rejected"
                        );
                        rejected_decisions += 1;
                        self.strategy.on_order_rejected(&decision);
                    }
                }
            }

            // --- 4. RECORD EQUITY ---
            equity_curve.push((tick.timestamp, self.portfolio.total_equity(&last_prices)));
            progress_bar.inc(1);
        }

        progress_bar.finish_and_clear();

        // --- 5. GENERATE FINAL REPORT ---
        let report = self
            .analytics_engine
            .calculate(&trades, &equity_curve, self.initial_capital)?;

        tracing::info!(
            strategy = self.strategy.name(),
            trades = trades.len(),
            net_profit = %report.total_net_profit,
            hive_signals = hive_signals.len(),
            "Backtest complete"
        );

        Ok(BacktestResult {
            strategy: self.strategy.name().to_string(),
            report,
            trades,
            equity_curve,
            hive_signals,
            hive_penalty: self.scorer.total_penalty(),
            open_positions: self.portfolio.positions().cloned().collect(),
            rejected_decisions,
        })
    }

    /// Sizes, fills and books one decision. On error nothing has been applied.
    fn process(
        &mut self,
        decision: &Decision,
        timestamp: DateTime<Utc>,
        prices: &BTreeMap<String, Decimal>,
    ) -> Result<Option<Trade>, BacktestError> {
        let snapshot = self.snapshot(prices);
        let order = self.risk_manager.size(decision, &snapshot)?;
        let execution = self.executor.execute(&order, timestamp)?;
        let trade = self.portfolio.apply(&execution)?;
        self.strategy.on_trade_executed(&execution);
        Ok(trade)
    }
}
