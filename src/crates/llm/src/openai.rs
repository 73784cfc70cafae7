//! OpenAI-compatible client implementation.
//!
//! Speaks the `/chat/completions` protocol shared by OpenAI and a wide
//! range of local and hosted servers. A system prompt, when present, is
//! sent as a separate `system` message ahead of the user prompt.

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use gambit_core::model::{CompletionError, CompletionModel, CompletionRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Client for OpenAI-compatible chat-completion APIs.
#[derive(Clone)]
pub struct OpenAiClient {
    config: ProviderConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = self.build_request(request);

        debug!(model = %self.config.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => ProviderError::Authentication(error_text),
                429 => ProviderError::RateLimitExceeded(error_text),
                _ => ProviderError::Provider(format!("API error {}: {}", status, error_text)),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".into()))?;

        match choice.message.content {
            Some(content) => Ok(content),
            None => Err(ProviderError::InvalidResponse(
                "choice has no message content".into(),
            )),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, CompletionError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            result = self.send(&request) => result.map_err(Into::into),
        }
    }
}

// Wire types for the chat-completions protocol.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
