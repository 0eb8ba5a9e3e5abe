//! # Hive Optimizer
//!
//! Sweeps a strategy's parameter space: every combination from the sweep's
//! `parameter_space` is applied onto the base configuration and backtested on the same
//! ticks in parallel (rayon), then the analyzer filters and ranks the reports.
//!
//! ## Public API
//!
//! - `Optimizer`: Runs a sweep.
//! - `SweepOutcome`: Ranked candidates plus counts of what ran and what was skipped.
//! - `generator`: Parameter set generation and overlay.

use crate::error::OptimizerError;
use crate::generator::{apply_parameter_set, describe, generate_parameter_sets, ParameterSet};
use analyzer::{Analyzer, CandidateReport, RankedReport};
use backtester::{BacktestError, Backtester};
use configuration::optimizer_config::SweepConfig;
use configuration::Config;
use core_types::{PriceUpdate, StrategyId};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

pub mod error;
pub mod generator;

/// The result of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepOutcome {
    pub strategy_id: StrategyId,
    pub total_sets: usize,
    /// Sets whose parameters were invalid or whose backtest failed.
    pub skipped_sets: usize,
    /// Candidates that survived the analysis filters, best first.
    pub ranked: Vec<RankedReport>,
}

pub struct Optimizer {
    sweep: SweepConfig,
    base_config: Config,
    analyzer: Analyzer,
    show_progress: bool,
}

impl Optimizer {
    pub fn new(sweep: SweepConfig, base_config: Config) -> Result<Self, OptimizerError> {
        let analyzer = Analyzer::new(sweep.analysis.clone())?;
        Ok(Self {
            sweep,
            base_config,
            analyzer,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn run(&self, ticks: &[PriceUpdate]) -> Result<SweepOutcome, OptimizerError> {
        if ticks.is_empty() {
            return Err(BacktestError::DataUnavailable.into());
        }

        let parameter_sets = generate_parameter_sets(&self.sweep.parameter_space)?;
        let total_sets = parameter_sets.len();

        tracing::info!(
            strategy = %self.sweep.strategy_id,
            runs = total_sets,
            threads = rayon::current_num_threads(),
            "Starting parameter sweep"
        );

        let progress_bar = self.progress_bar(total_sets)?;

        let candidates: Vec<CandidateReport> = parameter_sets
            .par_iter()
            .filter_map(|set| {
                let result = self.execute_single_backtest(set, ticks);
                progress_bar.inc(1);
                match result {
                    Ok(candidate) => Some(candidate),
                    Err(error) => {
                        tracing::warn!(parameters = %describe(set), %error, "Skipping parameter set");
                        None
                    }
                }
            })
            .collect();

        progress_bar.finish_and_clear();

        let skipped_sets = total_sets - candidates.len();
        if candidates.is_empty() {
            return Err(OptimizerError::NoValidRuns);
        }

        let ranked = self.analyzer.rank(candidates)?;

        tracing::info!(
            strategy = %self.sweep.strategy_id,
            ranked = ranked.len(),
            skipped = skipped_sets,
            "Parameter sweep complete"
        );

        Ok(SweepOutcome {
            strategy_id: self.sweep.strategy_id,
            total_sets,
            skipped_sets,
            ranked,
        })
    }

    fn execute_single_backtest(
        &self,
        set: &ParameterSet,
        ticks: &[PriceUpdate],
    ) -> Result<CandidateReport, OptimizerError> {
        let config = apply_parameter_set(&self.base_config, self.sweep.strategy_id, set)?;
        let result = Backtester::from_config(self.sweep.strategy_id, &config)?.run(ticks)?;

        Ok(CandidateReport {
            label: describe(set),
            parameters: serde_json::to_value(set)?,
            report: result.report,
            hive_penalty: result.hive_penalty,
        })
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar, OptimizerError> {
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
}
