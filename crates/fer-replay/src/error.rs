//! Replay error types.

use thiserror::Error;

use fer_models::{ConfigError, ParseEmotionError};
use fer_stabilizer::StabilizerError;

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Errors that can occur while replaying a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid smoothing config: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid class layout: {0}")]
    Layout(#[from] ParseEmotionError),

    #[error("Unknown replay mode: {0} (expected slots or tracked)")]
    InvalidMode(String),

    #[error("Stabilizer error: {0}")]
    Stabilizer(#[from] StabilizerError),
}
