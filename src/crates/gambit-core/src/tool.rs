//! Tool dispatch trait
//!
//! The seam between the interpreter and whatever executes tools. The
//! `tooling` crate provides the registry implementation; tests provide
//! scripted stand-ins.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog entry for one registered tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// Registry name, unique.
    pub name: String,
    /// Human-readable purpose, shown to the planner model.
    pub description: String,
    /// JSON-Schema (object form) describing the arguments.
    pub input_schema: serde_json::Value,
}

/// Tool dispatch failures, named by their stable client-facing kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// No tool registered under the requested name.
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// Arguments did not satisfy the tool's input schema.
    #[error("invalid arguments for tool '{tool}': {diagnostic}")]
    InvalidArguments { tool: String, diagnostic: String },

    /// The handler itself failed (or panicked).
    #[error("tool '{tool}' failed: {message}")]
    RuntimeError { tool: String, message: String },
}

impl ToolError {
    /// Stable kind name for boundary error mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::RuntimeError { .. } => "tool_runtime_error",
        }
    }
}

/// Validated dispatch to capability handlers.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Validate `args` against the named tool's schema and invoke it.
    ///
    /// Handler failures of any kind come back as [`ToolError`]; a handler
    /// is never allowed to take the interpreter down with it.
    async fn dispatch(&self, name: &str, args: serde_json::Value) -> Result<String, ToolError>;

    /// The ordered tool catalog.
    fn catalog(&self) -> Vec<ToolSpec>;
}
