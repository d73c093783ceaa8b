use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopydeskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scoring error: {0}")]
    Scoring(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cadence commit conflict: {0}")]
    CadenceConflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
