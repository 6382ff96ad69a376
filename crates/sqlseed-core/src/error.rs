use thiserror::Error;

/// Core error type shared across sqlseed crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog violates internal invariants.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    /// A table referenced by a query or FK is not in the catalog.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by sqlseed crates.
pub type Result<T> = std::result::Result<T, Error>;
