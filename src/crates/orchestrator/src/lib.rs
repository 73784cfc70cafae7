//! Orchestration layer for gambit
//!
//! Glues the core engine to the outside world:
//!
//! - `planner` - LLM-backed plan synthesis with one structured repair round
//! - `extract` - JSON extraction from free-form model output
//! - `registry` - process-wide execution records, event logs and subscribers
//! - `service` - the transport-agnostic boundary operations
//! - `api` - the axum HTTP surface (JSON + server-sent events)

pub mod api;
pub mod error;
pub mod extract;
pub mod planner;
pub mod registry;
pub mod service;

pub use error::{OrchestratorError, Result};
pub use registry::{ExecutionRegistry, ExecutionSnapshot, ExecutionStatus};
pub use service::{AgentService, PlannedQuery};
