//! LLM provider implementations for gambit.
//!
//! This crate provides concrete implementations of the `CompletionModel`
//! trait from `gambit-core`. The engine itself is provider-agnostic; this
//! crate supplies one client for OpenAI-compatible chat-completion APIs,
//! which covers OpenAI itself plus the many local and hosted servers that
//! speak the same wire format.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{OpenAiClient, ProviderConfig};
//! use gambit_core::model::{CompletionModel, CompletionRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProviderConfig::from_env()?;
//!     let client = OpenAiClient::new(config);
//!
//!     let request = CompletionRequest::new("What is Rust?")
//!         .with_temperature(0.2);
//!     let cancel = CancellationToken::new();
//!
//!     let completion = client.complete(request, &cancel).await?;
//!     println!("{}", completion);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod openai;

pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use openai::OpenAiClient;
