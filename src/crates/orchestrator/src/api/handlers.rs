//! API endpoint handlers.

use crate::api::error::ApiResult;
use crate::api::routes::AppState;
use crate::registry::ExecutionSnapshot;
use crate::service::PlannedQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use gambit_core::events::ExecutionEvent;
use gambit_core::plan::Plan;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;

/// Interval after which an idle event stream emits a heartbeat.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Request body for the planning operation.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub query: String,
}

/// Request body for the execution-start operation. Accepts `submit` output
/// round-tripped unchanged.
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub plan: Plan,
    pub query: String,
}

/// Response body for the execution-start operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    pub execution_id: String,
}

/// Query options for the status endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Include the event log snapshot in the response.
    #[serde(default)]
    pub include_events: bool,
}

/// Liveness probe.
///
/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Plan a query.
///
/// POST /api/v1/plan
pub async fn submit_plan(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<Json<PlannedQuery>> {
    let planned = state.service.submit(&req.query).await?;
    Ok(Json(planned))
}

/// Start executing a plan.
///
/// POST /api/v1/executions
pub async fn start_execution(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> ApiResult<(StatusCode, Json<StartResponse>)> {
    let execution_id = state.service.start(req.plan, req.query)?;
    Ok((StatusCode::ACCEPTED, Json(StartResponse { execution_id })))
}

/// Execution status report.
///
/// GET /api/v1/executions/:id
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<ExecutionSnapshot>> {
    let snapshot = state.service.status(&id, query.include_events)?;
    Ok(Json(snapshot))
}

/// Set the execution's cancellation signal.
///
/// POST /api/v1/executions/:id/stop
pub async fn stop_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.stop(&id)?;
    Ok(StatusCode::ACCEPTED)
}

/// Ordered tool catalog.
///
/// GET /api/v1/tools
pub async fn list_tools(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({"tools": state.service.catalog()}))
}

/// Live event stream for one execution.
///
/// GET /api/v1/executions/:id/events
///
/// Replays the event log so far, then delivers live events until the
/// terminal event has been sent, at which point the stream closes. While
/// idle, a heartbeat event goes out every 15 seconds.
pub async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let (replay, mut live) = state.service.subscribe(&id)?;

    let stream = async_stream::stream! {
        for event in replay {
            let terminal = event.is_terminal();
            yield Ok(to_sse(&event));
            if terminal {
                return;
            }
        }

        loop {
            match tokio::time::timeout(HEARTBEAT_INTERVAL, live.recv()).await {
                Ok(Some(event)) => {
                    let terminal = event.is_terminal();
                    yield Ok(to_sse(&event));
                    if terminal {
                        return;
                    }
                }
                // Channel closed without a terminal event: subscriber was
                // detached (slow consumer); end the stream.
                Ok(None) => return,
                Err(_) => yield Ok(to_sse(&ExecutionEvent::heartbeat())),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &ExecutionEvent) -> Event {
    let base = Event::default().event(event.event_type());
    match base.json_data(event) {
        Ok(sse_event) => sse_event,
        Err(_) => Event::default().event("error").data("{}"),
    }
}
