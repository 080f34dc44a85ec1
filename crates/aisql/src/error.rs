//! Error types for aisql

use thiserror::Error;

use crate::provider::ProviderError;

/// Main error type for aisql operations
#[derive(Error, Debug)]
pub enum AisqlError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream LLM provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A function argument is missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown function name
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for aisql operations
pub type Result<T> = std::result::Result<T, AisqlError>;
