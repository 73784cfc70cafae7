//! API error types and HTTP response conversion
//!
//! Every internal failure maps to a `{error, kind}` body with a stable
//! `kind` string; validation failures additionally carry the full
//! diagnostic list so clients (and the planner's own repair loop) see
//! every problem at once.

use crate::error::OrchestratorError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gambit_core::validate::PlanIssue;
use serde::{Deserialize, Serialize};

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Client-facing error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable error kind name.
    pub kind: String,
    /// Validation diagnostics, when applicable.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub diagnostics: Vec<PlanIssue>,
}

/// Error wrapper carrying the HTTP mapping.
#[derive(Debug)]
pub struct ApiError(pub OrchestratorError);

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            OrchestratorError::ExecutionNotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::SchemaViolation { .. }
            | OrchestratorError::PromptBudgetExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OrchestratorError::MalformedJson { .. }
            | OrchestratorError::PlannerUnrecoverable { .. } => StatusCode::BAD_GATEWAY,
            OrchestratorError::Completion(_) => StatusCode::BAD_GATEWAY,
            OrchestratorError::Tool(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Build the response body.
    pub fn body(&self) -> ApiErrorBody {
        ApiErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
            diagnostics: self.0.diagnostics().to_vec(),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.body();
        tracing::error!(kind = %body.kind, error = %body.error, "API error");
        (status, Json(body)).into_response()
    }
}
