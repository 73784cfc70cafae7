//! Plan interpreter
//!
//! A single-threaded instruction pointer over the validated step list. The
//! interpreter owns the variable environment for its execution; everything
//! the outside world learns about progress flows through the [`EventSink`]
//! observer. It blocks only on model calls, tool dispatch and the
//! between-step cancellation check.

use crate::condition::Expr;
use crate::env::{EnvError, Environment};
use crate::events::ExecutionEvent;
use crate::model::{CompletionError, CompletionModel, CompletionRequest};
use crate::plan::{Plan, Step, ToolArgument};
use crate::tool::ToolDispatcher;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Observer for execution lifecycle events.
///
/// `emit` must not block: implementations hand events to channels or logs,
/// never to slow consumers directly.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Reached `end` (or fell off the step list).
    Completed { result: String },
    /// A step error or the iteration cap terminated the run.
    Failed { reason: String, error: String },
    /// The cancellation signal stopped the run between steps.
    Stopped,
}

/// Reason kind for iteration cap exhaustion.
pub const ITERATION_CAP_EXCEEDED: &str = "iteration_cap_exceeded";

struct StepError {
    reason: &'static str,
    message: String,
}

impl StepError {
    fn new(reason: &'static str, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl From<EnvError> for StepError {
    fn from(err: EnvError) -> Self {
        StepError::new("duplicate_binding", err.to_string())
    }
}

/// Executes one plan to termination.
pub struct Interpreter {
    plan: Plan,
    environment: Environment,
    model: Arc<dyn CompletionModel>,
    tools: Arc<dyn ToolDispatcher>,
    cancel: CancellationToken,
}

impl Interpreter {
    /// Create an interpreter over a validated plan.
    ///
    /// The environment should already be seeded with the system-provided
    /// variables (`user_query` at minimum).
    pub fn new(
        plan: Plan,
        environment: Environment,
        model: Arc<dyn CompletionModel>,
        tools: Arc<dyn ToolDispatcher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            plan,
            environment,
            model,
            tools,
            cancel,
        }
    }

    /// Run the plan to termination, publishing lifecycle events to `sink`.
    pub async fn run(mut self, sink: &dyn EventSink) -> Outcome {
        sink.emit(ExecutionEvent::started());

        let index: HashMap<String, usize> = self
            .plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id().to_string(), i))
            .collect();
        let cap = self.plan.effective_cap();
        let steps = std::mem::take(&mut self.plan.steps);

        let mut pointer: usize = 0;
        let mut iterations: u32 = 0;
        // Value of the most recently bound llm/tool output; the `end`
        // step reports it as the execution result.
        let mut last_result = String::new();

        loop {
            if self.cancel.is_cancelled() {
                sink.emit(ExecutionEvent::stopped());
                return Outcome::Stopped;
            }

            if iterations >= cap {
                let error = format!("iteration cap of {} reached", cap);
                sink.emit(ExecutionEvent::failed(ITERATION_CAP_EXCEEDED, &error));
                return Outcome::Failed {
                    reason: ITERATION_CAP_EXCEEDED.to_string(),
                    error,
                };
            }

            let step = match steps.get(pointer) {
                Some(step) => step,
                // Fell off the end of the sequence: implicit `end`.
                None => {
                    sink.emit(ExecutionEvent::completed(&last_result));
                    return Outcome::Completed {
                        result: last_result,
                    };
                }
            };

            iterations += 1;
            sink.emit(ExecutionEvent::step_started(
                step.id(),
                step.kind(),
                step.description(),
            ));
            debug!(step_id = step.id(), kind = step.kind(), "executing step");

            match step {
                Step::Llm {
                    id,
                    prompt,
                    output_name,
                    ..
                } => {
                    let rendered = self.environment.render(prompt);
                    self.warn_missing(id, &rendered.refs_missing);

                    let request = CompletionRequest::new(rendered.text);
                    match self.model.complete(request, &self.cancel).await {
                        Ok(text) => {
                            if let Err(e) = self.environment.bind(output_name.clone(), text.clone())
                            {
                                return self.step_failed(sink, id, e.into());
                            }
                            last_result = text.clone();
                            sink.emit(ExecutionEvent::step_succeeded(id, Some(text)));
                            pointer += 1;
                        }
                        Err(CompletionError::Cancelled) if self.cancel.is_cancelled() => {
                            // The in-flight call observed the signal; the
                            // between-step check reports the stop.
                            sink.emit(ExecutionEvent::step_failed(
                                id,
                                CompletionError::Cancelled.to_string(),
                            ));
                            continue;
                        }
                        Err(e) => {
                            return self
                                .step_failed(sink, id, StepError::new(e.kind(), e.to_string()));
                        }
                    }
                }
                Step::Tool {
                    id,
                    tool_name,
                    arguments,
                    output_name,
                    ..
                } => {
                    let mut args = serde_json::Map::new();
                    for (key, argument) in arguments {
                        let value = match argument {
                            ToolArgument::Template(template) => {
                                let rendered = self.environment.render(template);
                                self.warn_missing(id, &rendered.refs_missing);
                                serde_json::Value::String(rendered.text)
                            }
                            ToolArgument::Literal(value) => value.clone(),
                        };
                        args.insert(key.clone(), value);
                    }

                    match self
                        .tools
                        .dispatch(tool_name, serde_json::Value::Object(args))
                        .await
                    {
                        Ok(result) => {
                            if let Err(e) =
                                self.environment.bind(output_name.clone(), result.clone())
                            {
                                return self.step_failed(sink, id, e.into());
                            }
                            last_result = result.clone();
                            sink.emit(ExecutionEvent::step_succeeded(id, Some(result)));
                            pointer += 1;
                        }
                        Err(e) => {
                            return self
                                .step_failed(sink, id, StepError::new(e.kind(), e.to_string()));
                        }
                    }
                }
                Step::If {
                    id,
                    condition,
                    goto_id,
                    ..
                } => {
                    let expr = match Expr::parse(condition) {
                        Ok(expr) => expr,
                        Err(e) => {
                            return self
                                .step_failed(sink, id, StepError::new("invalid_condition", e.to_string()));
                        }
                    };
                    let (taken, warnings) = expr.eval(&self.environment);
                    for warning in warnings {
                        warn!(step_id = id, %warning, "condition warning");
                    }

                    if taken {
                        match index.get(goto_id) {
                            Some(&target) => pointer = target,
                            None => {
                                return self.step_failed(
                                    sink,
                                    id,
                                    StepError::new(
                                        "dangling_goto",
                                        format!("goto target '{}' does not name a step", goto_id),
                                    ),
                                );
                            }
                        }
                    } else {
                        pointer += 1;
                    }
                    let branch = if taken { "branch-taken" } else { "branch-not-taken" };
                    sink.emit(ExecutionEvent::step_succeeded(id, Some(branch.to_string())));
                }
                Step::Goto { id, goto_id, .. } => match index.get(goto_id) {
                    Some(&target) => {
                        pointer = target;
                        sink.emit(ExecutionEvent::step_succeeded(id, None));
                    }
                    None => {
                        return self.step_failed(
                            sink,
                            id,
                            StepError::new(
                                "dangling_goto",
                                format!("goto target '{}' does not name a step", goto_id),
                            ),
                        );
                    }
                },
                Step::End { id, .. } => {
                    sink.emit(ExecutionEvent::step_succeeded(id, None));
                    sink.emit(ExecutionEvent::completed(&last_result));
                    return Outcome::Completed {
                        result: last_result,
                    };
                }
            }
        }
    }

    fn warn_missing(&self, step_id: &str, missing: &[String]) {
        for name in missing {
            warn!(step_id, variable = %name, "missing_ref: substituted empty string");
        }
    }

    fn step_failed(&self, sink: &dyn EventSink, step_id: &str, err: StepError) -> Outcome {
        sink.emit(ExecutionEvent::step_failed(step_id, &err.message));
        sink.emit(ExecutionEvent::failed(err.reason, &err.message));
        Outcome::Failed {
            reason: err.reason.to_string(),
            error: err.message,
        }
    }
}
