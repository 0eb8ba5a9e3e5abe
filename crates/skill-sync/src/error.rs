use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid baseline JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Found the start marker without a matching end marker")]
    UnterminatedSection,

    #[error("Found the end marker without a start marker")]
    OrphanedEndMarker,
}
