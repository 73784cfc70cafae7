//! API route definitions.

use crate::service::AgentService;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
}

/// Build the complete API router.
pub fn create_router(service: Arc<AgentService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/plan", post(handlers::submit_plan))
        .route("/api/v1/executions", post(handlers::start_execution))
        .route("/api/v1/executions/:id", get(handlers::get_execution))
        .route(
            "/api/v1/executions/:id/events",
            get(handlers::stream_events),
        )
        .route(
            "/api/v1/executions/:id/stop",
            post(handlers::stop_execution),
        )
        .route("/api/v1/tools", get(handlers::list_tools))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
