//! Boundary service
//!
//! The transport-agnostic face of the engine. Three core operations -
//! submit a query for planning, start an execution from a plan, subscribe
//! to an execution's events - plus status, stop and catalog queries. The
//! HTTP layer and the CLI are both thin shells over this type.

use crate::error::{OrchestratorError, Result};
use crate::planner::{Planner, SYSTEM_VARS};
use crate::registry::{ExecutionHandle, ExecutionRegistry, ExecutionSnapshot};
use gambit_core::events::ExecutionEvent;
use gambit_core::interpreter::Interpreter;
use gambit_core::model::CompletionModel;
use gambit_core::plan::Plan;
use gambit_core::tool::{ToolDispatcher, ToolSpec};
use gambit_core::validate::{has_errors, validate_plan};
use gambit_core::{Environment, USER_QUERY_VAR};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tooling::config::EngineConfig;
use tracing::{info, instrument};

/// A plan paired with the query that produced it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlannedQuery {
    pub plan: Plan,
    pub query: String,
}

/// The engine's outward-facing operations.
pub struct AgentService {
    planner: Planner,
    model: Arc<dyn CompletionModel>,
    tools: Arc<dyn ToolDispatcher>,
    registry: Arc<ExecutionRegistry>,
}

impl AgentService {
    /// Assemble the service from its collaborators.
    pub fn new(
        model: Arc<dyn CompletionModel>,
        tools: Arc<dyn ToolDispatcher>,
        config: EngineConfig,
    ) -> Self {
        let registry = Arc::new(ExecutionRegistry::new(
            config.subscriber_buffer,
            Duration::from_secs(config.execution_grace_seconds),
        ));
        let planner = Planner::new(model.clone(), config);

        Self {
            planner,
            model,
            tools,
            registry,
        }
    }

    /// The execution registry, for sweeper wiring and tests.
    pub fn registry(&self) -> &Arc<ExecutionRegistry> {
        &self.registry
    }

    /// Plan a natural-language query.
    #[instrument(skip(self))]
    pub async fn submit(&self, query: &str) -> Result<PlannedQuery> {
        let catalog = self.tools.catalog();
        let plan = self.planner.plan(query, &catalog).await?;
        Ok(PlannedQuery {
            plan,
            query: query.to_string(),
        })
    }

    /// Start executing a plan in the background; returns immediately with
    /// the new execution id.
    ///
    /// The plan is re-validated here because callers may construct plans
    /// themselves rather than round-tripping `submit` output.
    pub fn start(&self, plan: Plan, query: String) -> Result<String> {
        let catalog_names: Vec<String> =
            self.tools.catalog().into_iter().map(|t| t.name).collect();
        let issues = validate_plan(&plan, &catalog_names, SYSTEM_VARS);
        if has_errors(&issues) {
            return Err(OrchestratorError::SchemaViolation { diagnostics: issues });
        }

        let handle = self.registry.create(plan.clone(), query.clone());
        let execution_id = handle.execution_id().to_string();

        let mut environment = Environment::new();
        environment.seed(USER_QUERY_VAR, query);

        let interpreter = Interpreter::new(
            plan,
            environment,
            self.model.clone(),
            self.tools.clone(),
            handle.cancel_token().clone(),
        );

        let task_handle = handle.clone();
        tokio::spawn(async move {
            let outcome = interpreter.run(task_handle.as_ref()).await;
            info!(
                execution_id = %task_handle.execution_id(),
                ?outcome,
                "execution finished"
            );
        });

        Ok(execution_id)
    }

    /// Subscribe to an execution's events: the replayed log so far plus a
    /// live channel that closes after the terminal event.
    pub fn subscribe(
        &self,
        execution_id: &str,
    ) -> Result<(Vec<ExecutionEvent>, mpsc::Receiver<ExecutionEvent>)> {
        let handle = self.lookup(execution_id)?;
        Ok(handle.attach_subscriber())
    }

    /// Status report for one execution.
    pub fn status(&self, execution_id: &str, include_log: bool) -> Result<ExecutionSnapshot> {
        Ok(self.lookup(execution_id)?.snapshot(include_log))
    }

    /// Set an execution's cancellation signal.
    pub fn stop(&self, execution_id: &str) -> Result<()> {
        self.lookup(execution_id)?.cancel_token().cancel();
        Ok(())
    }

    /// The ordered tool catalog.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.tools.catalog()
    }

    /// Cancel all pending executions (process shutdown).
    pub fn shutdown(&self) {
        self.registry.drain();
    }

    fn lookup(&self, execution_id: &str) -> Result<Arc<ExecutionHandle>> {
        self.registry
            .get(execution_id)
            .ok_or_else(|| OrchestratorError::ExecutionNotFound(execution_id.to_string()))
    }
}
