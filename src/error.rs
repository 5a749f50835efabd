use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the classifier and its model store.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("unknown classification: {0}")]
    UnknownClassification(String),

    #[error("cannot rebalance: {0} has no training documents")]
    EmptyClass(String),

    #[error("training file not found: {}", .0.display())]
    TrainingFileNotFound(PathBuf),

    #[error("model store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("model store serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
