use thiserror::Error;

/// Errors emitted by resolution, generation and the literal codec.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("table '{table}' has no insertable columns")]
    NoInsertableColumns { table: String },
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Core(#[from] sqlseed_core::Error),
}

impl GenerationError {
    /// Schema problems that regenerating cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoInsertableColumns { .. } | Self::UnknownTable(_) | Self::Core(_)
        )
    }
}
