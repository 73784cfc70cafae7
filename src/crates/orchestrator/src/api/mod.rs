//! HTTP boundary
//!
//! Maps the transport-agnostic [`crate::service::AgentService`] operations
//! onto an axum router. Event streaming uses server-sent events; the event
//! payloads themselves are the transport-independent records from
//! `gambit_core::events`.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::{create_router, AppState};
