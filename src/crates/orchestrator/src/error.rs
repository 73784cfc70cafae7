//! Orchestrator error types
//!
//! Every internal failure mode carries a stable `kind` name so the boundary
//! can map it to a client-facing `{error, kind}` record without guessing.

use gambit_core::model::CompletionError;
use gambit_core::tool::ToolError;
use gambit_core::validate::PlanIssue;
use thiserror::Error;

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failures surfaced by planning and execution management.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The planner failed its single repair round.
    #[error("planner could not produce a valid plan: {message}")]
    PlannerUnrecoverable {
        message: String,
        diagnostics: Vec<PlanIssue>,
    },

    /// Model output did not contain a parseable JSON object.
    #[error("malformed JSON in model output at byte {position}: {message}")]
    MalformedJson { position: usize, message: String },

    /// A plan failed structural validation.
    #[error("plan failed validation with {} issue(s)", diagnostics.len())]
    SchemaViolation { diagnostics: Vec<PlanIssue> },

    /// The planner prompt exceeds the configured context budget.
    #[error("planning prompt needs {tokens} tokens but the budget is {budget}")]
    PromptBudgetExceeded { tokens: usize, budget: usize },

    /// No execution registered under the given id.
    #[error("execution '{0}' not found")]
    ExecutionNotFound(String),

    /// LLM call failure.
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Tool dispatch failure.
    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl OrchestratorError {
    /// Stable kind name for boundary error mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::PlannerUnrecoverable { .. } => "planner_unrecoverable",
            OrchestratorError::MalformedJson { .. } => "malformed_json",
            OrchestratorError::SchemaViolation { .. } => "schema_violation",
            OrchestratorError::PromptBudgetExceeded { .. } => "prompt_budget_exceeded",
            OrchestratorError::ExecutionNotFound(_) => "execution_not_found",
            OrchestratorError::Completion(e) => e.kind(),
            OrchestratorError::Tool(e) => e.kind(),
        }
    }

    /// Validation diagnostics, when the failure carries them.
    pub fn diagnostics(&self) -> &[PlanIssue] {
        match self {
            OrchestratorError::PlannerUnrecoverable { diagnostics, .. }
            | OrchestratorError::SchemaViolation { diagnostics } => diagnostics,
            _ => &[],
        }
    }
}
