//! Error types for p2g-core

use thiserror::Error;

/// Result type alias using p2g-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in p2g-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
