//! LLM integration trait
//!
//! The engine stays provider-agnostic: this module defines the completion
//! trait and its error contract, and provider crates implement it. The
//! interpreter and the planner only ever see `dyn CompletionModel`.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// One completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    /// The user-level prompt text.
    pub prompt: String,
    /// Optional higher-priority instruction prefix.
    pub system_prompt: Option<String>,
    /// Upper bound on response size.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request for a bare prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Set the response size bound.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Completion failures, named by their stable client-facing kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// Transport or provider failure.
    #[error("llm network error: {0}")]
    Network(String),

    /// Provider rejected the request for rate limiting.
    #[error("llm rate limited: {0}")]
    RateLimited(String),

    /// Provider answered with something that is not a usable completion.
    #[error("llm invalid response: {0}")]
    InvalidResponse(String),

    /// The cancellation signal fired while the call was in flight.
    #[error("llm call cancelled")]
    Cancelled,
}

impl CompletionError {
    /// Stable kind name for boundary error mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Network(_) => "llm_network",
            CompletionError::RateLimited(_) => "llm_rate_limited",
            CompletionError::InvalidResponse(_) => "llm_invalid_response",
            CompletionError::Cancelled => "llm_cancelled",
        }
    }
}

/// A text-completion provider.
///
/// Implementations honour the cancellation token and return
/// [`CompletionError::Cancelled`] promptly when it fires.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Produce a completion for the request.
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, CompletionError>;
}
