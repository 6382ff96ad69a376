use sqlseed_generate::GenerationError;
use thiserror::Error;

/// Errors emitted by validation, the retry loop and the strategy pipeline.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("no attempt produced statements after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: usize, last_error: String },
    #[error("generation cancelled")]
    Cancelled,
    #[error("deadline exceeded before any attempt completed")]
    DeadlineExceeded,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvalError {
    /// Errors that another attempt or strategy cannot fix.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Generation(err) => err.is_fatal(),
            Self::Cancelled | Self::DeadlineExceeded => true,
            Self::Exhausted { .. } | Self::Json(_) => false,
        }
    }

    /// Errors that stop the strategy pipeline outright.
    pub fn stops_pipeline(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
