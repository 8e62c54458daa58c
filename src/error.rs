use std::io;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure kinds for store operations. Every error is scoped to the single
/// request that produced it; nothing here is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Missing file, missing sheet, or no row matched a key/filter.
    #[error("not found: {0}")]
    NotFound(String),

    /// Create was asked to overwrite an existing file.
    #[error("already exists: {0}")]
    Conflict(String),

    /// Malformed request: bad filter/sort spec, missing required field, or a
    /// write the target dialect cannot express.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Disk read/write failure, surfaced directly and never retried.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn invalid(what: impl Into<String>) -> Self {
        StoreError::InvalidInput(what.into())
    }
}
