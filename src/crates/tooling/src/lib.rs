//! Tooling for the gambit engine
//!
//! This crate provides the capability side of the system:
//!
//! - `registry` - schema-validated tool registration and dispatch
//! - `tools` - the built-in time and file-listing tools
//! - `config` - environment variable loading and the engine configuration
//! - `logging` - tracing subscriber bootstrap for binaries

pub mod config;
pub mod logging;
pub mod registry;
pub mod tools;

use thiserror::Error;

/// Errors that can occur in the tooling crate.
#[derive(Debug, Error)]
pub enum ToolingError {
    /// General error with message.
    #[error("Tooling error: {0}")]
    General(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tooling operations.
pub type Result<T> = std::result::Result<T, ToolingError>;

pub use registry::{Tool, ToolRegistry};
