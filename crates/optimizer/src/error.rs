use indicatif::style::TemplateError;
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Backtest execution failed within optimizer: {0}")]
    Backtest(#[from] backtester::BacktestError),

    #[error("Analysis error: {0}")]
    Analyzer(#[from] analyzer::error::AnalyzerError),

    #[error("Parameter generation failed: {0}")]
    ParameterGeneration(String),

    #[error("Unknown parameter '{0}' for this strategy")]
    UnknownParameter(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] JsonError),

    #[error("Every parameter set failed; nothing to rank")]
    NoValidRuns,

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<TemplateError> for OptimizerError {
    fn from(error: TemplateError) -> Self {
        OptimizerError::ProgressBarTemplate(error.to_string())
    }
}
