use std::path::PathBuf;
use thiserror::Error;

/// Everything the core can fail with. None of these are fatal: the
/// orchestrator recovers from each one and keeps the loop alive.
#[derive(Debug, Error)]
pub(crate) enum CoreError {
    #[error("no frames for animation '{name}' in {dir}")]
    AssetNotFound { name: String, dir: PathBuf },

    #[error("save record unusable: {0}")]
    Persistence(String),

    #[error("write outside surface at row {row}, col {col}")]
    Render { row: u16, col: u16 },

    #[error("activity did not stop in time (score {score})")]
    ActivityStopTimeout { score: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub(crate) type CoreResult<T> = Result<T, CoreError>;
