//! Common error types for EmoGo

use thiserror::Error;

/// Common result type for EmoGo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the EmoGo crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    ///
    /// Raised when the sample store is unreachable or a query fails.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored value cannot be interpreted as the expected type
    /// (e.g. a coordinate that is not numeric)
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}
