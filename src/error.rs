//! Error types for the Slidegate service.

use thiserror::Error;

/// Main error type for Slidegate operations.
#[derive(Error, Debug)]
pub enum SlidegateError {
    /// A rate rule failed validation.
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Slidegate operations.
pub type Result<T> = std::result::Result<T, SlidegateError>;
