//! Common error types for the placement desk

use thiserror::Error;

/// Common result type for placement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by the store, the services and the binaries
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write refused because it collides with existing data
    #[error("Conflict: {0}")]
    Conflict(String),

    /// UNIQUE collision on a named request field
    #[error("Duplicate value for {field}")]
    Duplicate { field: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
