//! Error types for the Formgate service.

use thiserror::Error;

/// Main error type for Formgate operations.
///
/// A rate limit denial is a normal decision, not an error; these variants
/// only cover lookups, configuration and I/O.
#[derive(Error, Debug)]
pub enum FormgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No limiter is registered under the requested name
    #[error("Unknown rate limiter: {0}")]
    UnknownLimiter(String),

    /// Malformed request from an HTTP caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Formgate operations.
pub type Result<T> = std::result::Result<T, FormgateError>;
