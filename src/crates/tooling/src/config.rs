//! Environment configuration
//!
//! Helpers for loading environment variables with proper error handling,
//! plus the engine-wide configuration record they populate.

use crate::{Result, ToolingError};
use std::env;
use std::str::FromStr;

/// Load an environment variable as a string.
///
/// Returns `Ok(None)` when the variable is unset and an error only when it
/// exists but holds invalid UTF-8.
pub fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ToolingError::General(format!(
            "Environment variable {} contains invalid UTF-8",
            key
        ))),
    }
}

/// Load and parse an environment variable.
pub fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env(key)? {
        Some(val) => {
            let parsed = val.parse::<T>().map_err(|e| {
                ToolingError::General(format!(
                    "Failed to parse environment variable {}: {}",
                    key, e
                ))
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Load and parse an environment variable with a default value.
pub fn get_env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_env_parse(key)?.unwrap_or(default))
}

/// Engine-wide settings drawn from the closed environment variable set.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default `max_iterations` advertised to the planner (`MAX_AGENT_ITERATIONS`).
    pub max_agent_iterations: u32,
    /// Planner prompt token ceiling (`MAX_CONTEXT_TOKENS`).
    pub max_context_tokens: usize,
    /// Headroom reserved below the ceiling (`CONTEXT_TOKEN_BUFFER`).
    pub context_token_buffer: usize,
    /// Entry cap for the file-listing tool (`LIST_FILES_LIMIT`).
    pub list_files_limit: usize,
    /// Seconds a finished execution stays replayable (`EXECUTION_GRACE_SECONDS`).
    pub execution_grace_seconds: u64,
    /// Per-subscriber event buffer size (`SUBSCRIBER_BUFFER`).
    pub subscriber_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_agent_iterations: 10,
            max_context_tokens: 25_000,
            context_token_buffer: 2_000,
            list_files_limit: 20,
            execution_grace_seconds: 600,
            subscriber_buffer: 64,
        }
    }
}

impl EngineConfig {
    /// Load the configuration from the environment, falling back to the
    /// documented defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_agent_iterations: get_env_parse_or(
                "MAX_AGENT_ITERATIONS",
                defaults.max_agent_iterations,
            )?,
            max_context_tokens: get_env_parse_or(
                "MAX_CONTEXT_TOKENS",
                defaults.max_context_tokens,
            )?,
            context_token_buffer: get_env_parse_or(
                "CONTEXT_TOKEN_BUFFER",
                defaults.context_token_buffer,
            )?,
            list_files_limit: get_env_parse_or("LIST_FILES_LIMIT", defaults.list_files_limit)?,
            execution_grace_seconds: get_env_parse_or(
                "EXECUTION_GRACE_SECONDS",
                defaults.execution_grace_seconds,
            )?,
            subscriber_buffer: get_env_parse_or("SUBSCRIBER_BUFFER", defaults.subscriber_buffer)?,
        })
    }

    /// Token budget available to the planner prompt.
    pub fn prompt_token_budget(&self) -> usize {
        self.max_context_tokens
            .saturating_sub(self.context_token_buffer)
    }
}
