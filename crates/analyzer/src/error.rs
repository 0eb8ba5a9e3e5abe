use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("No candidate reports were provided for ranking")]
    NoCandidates,

    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),
}
