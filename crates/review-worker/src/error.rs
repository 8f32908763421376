//! Review pipeline error types

use chess_core::NotationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Raw engine I/O failure. The arbiter turns repeated ones into `EngineUnavailable`.
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Categorization skipped: {0}")]
    CategorizationSkipped(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<NotationError> for ReviewError {
    fn from(e: NotationError) -> Self {
        ReviewError::InvalidPosition(e.to_string())
    }
}
