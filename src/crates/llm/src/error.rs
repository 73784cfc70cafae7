//! Error types for LLM provider implementations.

use gambit_core::model::CompletionError;
use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur when working with LLM providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid response from provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request was cancelled before completing.
    #[error("Request cancelled")]
    Cancelled,

    /// General provider error.
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Map provider failures onto the engine's completion error contract.
impl From<ProviderError> for CompletionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimitExceeded(msg) => CompletionError::RateLimited(msg),
            ProviderError::InvalidResponse(msg) => CompletionError::InvalidResponse(msg),
            ProviderError::Cancelled => CompletionError::Cancelled,
            other => CompletionError::Network(other.to_string()),
        }
    }
}
