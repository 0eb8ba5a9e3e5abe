use crate::error::AnalyzerError;
use analytics::PerformanceReport;
use configuration::optimizer_config::AnalysisConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

pub mod error;

/// One backtest outcome to be ranked: the parameters that produced it, its report and
/// the hive penalty it accumulated.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub label: String,
    pub parameters: Value,
    pub report: PerformanceReport,
    pub hive_penalty: Decimal,
}

/// A candidate together with its final analysis score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedReport {
    pub rank: usize,
    pub score: Decimal,
    pub candidate: CandidateReport,
}

/// The main analysis engine.
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalyzerError> {
        let w = &config.scoring_weights;
        let weights = [
            w.weight_profit_factor,
            w.weight_calmar_ratio,
            w.weight_payoff_ratio,
            w.weight_hive_penalty,
        ];
        if weights.iter().any(|weight| *weight < Decimal::ZERO) {
            return Err(AnalyzerError::InvalidWeights(
                "scoring weights cannot be negative".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Filters, scores, and ranks candidates, best first.
    pub fn rank(&self, candidates: Vec<CandidateReport>) -> Result<Vec<RankedReport>, AnalyzerError> {
        if candidates.is_empty() {
            return Err(AnalyzerError::NoCandidates);
        }

        // 1. Filter
        let total = candidates.len();
        let filtered = self.filter_candidates(candidates);
        tracing::info!(total, kept = filtered.len(), "Filtered candidates");
        if filtered.is_empty() {
            return Ok(vec![]); // Return empty if all were filtered out
        }

        // 2. Score
        let mut ranked = self.score_candidates(filtered);

        // 3. Rank
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        for (i, r) in ranked.iter_mut().enumerate() {
            r.rank = i + 1;
        }
        Ok(ranked)
    }

    /// Applies hard filters to remove unacceptable runs.
    fn filter_candidates(&self, candidates: Vec<CandidateReport>) -> Vec<CandidateReport> {
        let filters = &self.config.filters;
        candidates
            .into_iter()
            .filter(|c| {
                let passes_trades = c.report.total_trades >= filters.min_total_trades;
                let passes_drawdown = c.report.max_drawdown_pct < filters.max_drawdown_pct;
                passes_trades && passes_drawdown
            })
            .collect()
    }

    /// Normalizes and applies the weighted scoring function to each candidate.
    fn score_candidates(&self, candidates: Vec<CandidateReport>) -> Vec<RankedReport> {
        let pf = find_min_max(&candidates, |c| c.report.profit_factor);
        let cr = find_min_max(&candidates, |c| c.report.calmar_ratio);
        let pr = find_min_max(&candidates, |c| c.report.payoff_ratio);
        let hp = find_min_max(&candidates, |c| Some(c.hive_penalty));

        let w = &self.config.scoring_weights;
        candidates
            .into_iter()
            .map(|c| {
                let norm_pf = normalize(c.report.profit_factor, pf, Decimal::ONE);
                let norm_cr = normalize(c.report.calmar_ratio, cr, Decimal::ONE);
                let norm_pr = normalize(c.report.payoff_ratio, pr, Decimal::ONE);
                // Equal penalties do not separate candidates.
                let norm_hp = normalize(Some(c.hive_penalty), hp, Decimal::ZERO);

                let score = (norm_pf * w.weight_profit_factor)
                    + (norm_cr * w.weight_calmar_ratio)
                    + (norm_pr * w.weight_payoff_ratio)
                    - (norm_hp * w.weight_hive_penalty);

                RankedReport {
                    rank: 0,
                    score,
                    candidate: c,
                }
            })
            .collect()
    }
}

/// The min and max of a metric across candidates, ignoring those where it is undefined.
fn find_min_max<F>(candidates: &[CandidateReport], accessor: F) -> Option<(Decimal, Decimal)>
where
    F: Fn(&CandidateReport) -> Option<Decimal>,
{
    candidates
        .iter()
        .filter_map(accessor)
        .fold(None, |acc, val| match acc {
            None => Some((val, val)),
            Some((min, max)) => Some((min.min(val), max.max(val))),
        })
}

/// Normalizes a value to a 0-1 scale. An undefined value scores 0; when every candidate
/// has the same value, `flat` is used.
fn normalize(value: Option<Decimal>, range: Option<(Decimal, Decimal)>, flat: Decimal) -> Decimal {
    match (value, range) {
        (Some(_), Some((min, max))) if min == max => flat,
        (Some(value), Some((min, max))) => (value - min) / (max - min),
        _ => Decimal::ZERO,
    }
}
