//! Error types for the whistle client

use thiserror::Error;

use crate::signer::SignerError;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error types
///
/// Read failures against the ledger and corruption of the local mirror are
/// deliberately absent: both are absorbed into sentinels where they occur.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A required input was missing or malformed
    #[error("{0}")]
    Validation(String),

    /// The external signer refused or failed the call
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// Membership hash computation failed
    #[error("Hash provider error: {0}")]
    Hash(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Shorthand for a validation failure on a required field
    pub fn missing(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }
}
