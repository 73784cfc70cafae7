//! Execution lifecycle events
//!
//! The closed set of events an execution publishes to its observers. The
//! set is part of the external contract: transports (SSE, in-process
//! channels, a CLI printer) carry these records verbatim.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Events emitted over the lifetime of one execution.
///
/// Events are totally ordered per execution; one of the `Execution*`
/// terminal events is always the last non-heartbeat event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// The interpreter task has started.
    ExecutionStarted { started_at: String },
    /// A step was fetched and is about to run.
    StepStarted {
        step_id: String,
        step_type: String,
        description: String,
    },
    /// A step finished, successfully or not.
    StepCompleted {
        step_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The plan reached an `end` step (or fell off the sequence).
    ExecutionCompleted { result: String, finished_at: String },
    /// A step error or resource bound terminated the execution.
    ExecutionFailed {
        reason: String,
        finished_at: String,
        error: String,
    },
    /// The cancellation signal stopped the execution.
    ExecutionStopped { finished_at: String },
    /// Idle keep-alive; emitted by the stream layer, never logged.
    Heartbeat {},
}

impl ExecutionEvent {
    /// Create an `execution_started` event stamped now.
    pub fn started() -> Self {
        ExecutionEvent::ExecutionStarted {
            started_at: now_rfc3339(),
        }
    }

    /// Create a `step_started` event.
    pub fn step_started(
        step_id: impl Into<String>,
        step_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        ExecutionEvent::StepStarted {
            step_id: step_id.into(),
            step_type: step_type.into(),
            description: description.into(),
        }
    }

    /// Create a successful `step_completed` event.
    pub fn step_succeeded(step_id: impl Into<String>, result: Option<String>) -> Self {
        ExecutionEvent::StepCompleted {
            step_id: step_id.into(),
            success: true,
            result,
            error: None,
        }
    }

    /// Create a failed `step_completed` event.
    pub fn step_failed(step_id: impl Into<String>, error: impl Into<String>) -> Self {
        ExecutionEvent::StepCompleted {
            step_id: step_id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Create an `execution_completed` event stamped now.
    pub fn completed(result: impl Into<String>) -> Self {
        ExecutionEvent::ExecutionCompleted {
            result: result.into(),
            finished_at: now_rfc3339(),
        }
    }

    /// Create an `execution_failed` event stamped now.
    pub fn failed(reason: impl Into<String>, error: impl Into<String>) -> Self {
        ExecutionEvent::ExecutionFailed {
            reason: reason.into(),
            finished_at: now_rfc3339(),
            error: error.into(),
        }
    }

    /// Create an `execution_stopped` event stamped now.
    pub fn stopped() -> Self {
        ExecutionEvent::ExecutionStopped {
            finished_at: now_rfc3339(),
        }
    }

    /// Create a heartbeat event.
    pub fn heartbeat() -> Self {
        ExecutionEvent::Heartbeat {}
    }

    /// The event's wire tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            ExecutionEvent::ExecutionStarted { .. } => "execution_started",
            ExecutionEvent::StepStarted { .. } => "step_started",
            ExecutionEvent::StepCompleted { .. } => "step_completed",
            ExecutionEvent::ExecutionCompleted { .. } => "execution_completed",
            ExecutionEvent::ExecutionFailed { .. } => "execution_failed",
            ExecutionEvent::ExecutionStopped { .. } => "execution_stopped",
            ExecutionEvent::Heartbeat { .. } => "heartbeat",
        }
    }

    /// True for the three events that end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionEvent::ExecutionCompleted { .. }
                | ExecutionEvent::ExecutionFailed { .. }
                | ExecutionEvent::ExecutionStopped { .. }
        )
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tags() {
        assert_eq!(ExecutionEvent::started().event_type(), "execution_started");
        assert_eq!(
            ExecutionEvent::step_started("S1", "llm", "draft").event_type(),
            "step_started"
        );
        assert_eq!(
            ExecutionEvent::step_succeeded("S1", None).event_type(),
            "step_completed"
        );
        assert_eq!(
            ExecutionEvent::completed("done").event_type(),
            "execution_completed"
        );
        assert_eq!(
            ExecutionEvent::failed("tool_runtime_error", "boom").event_type(),
            "execution_failed"
        );
        assert_eq!(ExecutionEvent::stopped().event_type(), "execution_stopped");
        assert_eq!(ExecutionEvent::heartbeat().event_type(), "heartbeat");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(ExecutionEvent::completed("x").is_terminal());
        assert!(ExecutionEvent::failed("r", "e").is_terminal());
        assert!(ExecutionEvent::stopped().is_terminal());
        assert!(!ExecutionEvent::started().is_terminal());
        assert!(!ExecutionEvent::heartbeat().is_terminal());
        assert!(!ExecutionEvent::step_succeeded("S1", None).is_terminal());
    }

    #[test]
    fn test_serialization_tag_and_optional_fields() {
        let event = ExecutionEvent::step_succeeded("T1", Some("14:02".to_string()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "step_completed");
        assert_eq!(json["success"], true);
        assert_eq!(json["result"], "14:02");
        assert!(json.get("error").is_none());

        let back: ExecutionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_started_at_is_rfc3339() {
        let event = ExecutionEvent::started();
        if let ExecutionEvent::ExecutionStarted { started_at } = &event {
            assert!(chrono::DateTime::parse_from_rfc3339(started_at).is_ok());
        } else {
            panic!("expected ExecutionStarted");
        }
    }
}
