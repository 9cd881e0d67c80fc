//! Unified error types for OmniRead Core.

use omniread_types::{ConfigError, GatewayError, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Main error type for all OmniRead core operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Generative call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Local data store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for OmniRead core operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Unknown(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Unknown(s.to_string())
    }
}
