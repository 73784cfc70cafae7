//! Execution registry
//!
//! The only process-wide mutable state: a map from execution id to the live
//! record of one running (or recently finished) plan. Publishing appends to
//! the record's event log and fans out to subscribers without ever blocking
//! on them; a subscriber whose buffer is full is detached, not awaited.

use gambit_core::events::ExecutionEvent;
use gambit_core::interpreter::EventSink;
use gambit_core::plan::Plan;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Execution lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Starting,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl ExecutionStatus {
    /// True once the execution can no longer produce events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Stopped
        )
    }

    /// The status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Starting => "starting",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Stopped => "stopped",
        }
    }
}

/// Mutable per-execution state, guarded by the record mutex.
struct ExecutionState {
    plan: Plan,
    query: String,
    status: ExecutionStatus,
    started_at: String,
    finished_at: Option<String>,
    current_step_id: Option<String>,
    final_result: Option<String>,
    error: Option<String>,
    event_log: Vec<ExecutionEvent>,
    subscribers: Vec<mpsc::Sender<ExecutionEvent>>,
    expires_at: Option<Instant>,
}

/// Read-only snapshot of an execution's state for status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    pub execution_id: String,
    pub plan: Plan,
    pub query: String,
    pub status: ExecutionStatus,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_log: Option<Vec<ExecutionEvent>>,
}

/// One live execution record.
pub struct ExecutionHandle {
    execution_id: String,
    cancel: CancellationToken,
    subscriber_buffer: usize,
    grace: Duration,
    state: Mutex<ExecutionState>,
}

impl ExecutionHandle {
    /// The record's opaque id.
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// The execution's cancellation signal.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Current status.
    pub fn status(&self) -> ExecutionStatus {
        self.state.lock().status
    }

    /// Append an event to the log and fan it out to subscribers.
    ///
    /// The mutex is held for O(log-append + subscriber try_send) only;
    /// a full subscriber buffer detaches that subscriber immediately.
    pub fn publish(&self, event: ExecutionEvent) {
        let mut state = self.state.lock();

        match &event {
            ExecutionEvent::ExecutionStarted { .. } => {
                state.status = ExecutionStatus::Running;
            }
            ExecutionEvent::StepStarted { step_id, .. } => {
                state.current_step_id = Some(step_id.clone());
            }
            ExecutionEvent::ExecutionCompleted {
                result,
                finished_at,
            } => {
                state.status = ExecutionStatus::Completed;
                state.final_result = Some(result.clone());
                state.finished_at = Some(finished_at.clone());
                state.expires_at = Some(Instant::now() + self.grace);
            }
            ExecutionEvent::ExecutionFailed {
                error, finished_at, ..
            } => {
                state.status = ExecutionStatus::Failed;
                state.error = Some(error.clone());
                state.finished_at = Some(finished_at.clone());
                state.expires_at = Some(Instant::now() + self.grace);
            }
            ExecutionEvent::ExecutionStopped { finished_at } => {
                state.status = ExecutionStatus::Stopped;
                state.finished_at = Some(finished_at.clone());
                state.expires_at = Some(Instant::now() + self.grace);
            }
            _ => {}
        }

        state.event_log.push(event.clone());

        let terminal = event.is_terminal();
        state.subscribers.retain(|sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        execution_id = %self.execution_id,
                        "subscriber buffer full; detaching slow consumer"
                    );
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        if terminal {
            // Dropping the senders closes every live stream after the
            // terminal event is consumed.
            state.subscribers.clear();
        }
    }

    /// Attach a subscriber: an atomic snapshot of the log so far, plus a
    /// live channel for everything after it. For a terminated execution
    /// the channel is already closed and only the replay matters.
    pub fn attach_subscriber(
        &self,
    ) -> (Vec<ExecutionEvent>, mpsc::Receiver<ExecutionEvent>) {
        let mut state = self.state.lock();
        let snapshot = state.event_log.clone();
        let (tx, rx) = mpsc::channel(self.subscriber_buffer);
        if !state.status.is_terminal() {
            state.subscribers.push(tx);
        }
        (snapshot, rx)
    }

    /// Current subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    /// Snapshot the record for a status query.
    pub fn snapshot(&self, include_log: bool) -> ExecutionSnapshot {
        let state = self.state.lock();
        ExecutionSnapshot {
            execution_id: self.execution_id.clone(),
            plan: state.plan.clone(),
            query: state.query.clone(),
            status: state.status,
            started_at: state.started_at.clone(),
            finished_at: state.finished_at.clone(),
            current_step_id: state.current_step_id.clone(),
            final_result: state.final_result.clone(),
            error: state.error.clone(),
            event_log: include_log.then(|| state.event_log.clone()),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        let state = self.state.lock();
        matches!(state.expires_at, Some(deadline) if now >= deadline)
    }
}

impl EventSink for ExecutionHandle {
    fn emit(&self, event: ExecutionEvent) {
        self.publish(event);
    }
}

/// Process-wide map of live and recently finished executions.
pub struct ExecutionRegistry {
    executions: DashMap<String, Arc<ExecutionHandle>>,
    subscriber_buffer: usize,
    grace: Duration,
}

impl ExecutionRegistry {
    /// Create a registry with the given subscriber buffer size and
    /// post-termination grace period.
    pub fn new(subscriber_buffer: usize, grace: Duration) -> Self {
        Self {
            executions: DashMap::new(),
            subscriber_buffer,
            grace,
        }
    }

    /// Register a new execution in `starting` state.
    pub fn create(&self, plan: Plan, query: String) -> Arc<ExecutionHandle> {
        let execution_id = Uuid::new_v4().to_string();
        let handle = Arc::new(ExecutionHandle {
            execution_id: execution_id.clone(),
            cancel: CancellationToken::new(),
            subscriber_buffer: self.subscriber_buffer,
            grace: self.grace,
            state: Mutex::new(ExecutionState {
                plan,
                query,
                status: ExecutionStatus::Starting,
                started_at: chrono::Utc::now().to_rfc3339(),
                finished_at: None,
                current_step_id: None,
                final_result: None,
                error: None,
                event_log: Vec::new(),
                subscribers: Vec::new(),
                expires_at: None,
            }),
        });

        self.executions.insert(execution_id.clone(), handle.clone());
        info!(%execution_id, "registered execution");
        handle
    }

    /// Look up an execution by id.
    pub fn get(&self, execution_id: &str) -> Option<Arc<ExecutionHandle>> {
        self.executions.get(execution_id).map(|e| e.clone())
    }

    /// Number of retained records (live and in-grace).
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// True when no record is retained.
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }

    /// Ask an execution to stop. Returns false for an unknown id.
    pub fn stop(&self, execution_id: &str) -> bool {
        match self.get(execution_id) {
            Some(handle) => {
                handle.cancel_token().cancel();
                true
            }
            None => false,
        }
    }

    /// Evict records whose grace period has elapsed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .executions
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        for execution_id in &expired {
            self.executions.remove(execution_id);
            debug!(%execution_id, "swept expired execution");
        }
        expired.len()
    }

    /// Cancel every non-terminal execution (process shutdown).
    pub fn drain(&self) {
        for entry in self.executions.iter() {
            if !entry.value().status().is_terminal() {
                entry.value().cancel_token().cancel();
            }
        }
    }

    /// Spawn the periodic sweeper task.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                registry.sweep_expired();
            }
        })
    }
}
