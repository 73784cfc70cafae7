//! Plan data model
//!
//! A plan is an ordered sequence of labelled steps plus an iteration cap.
//! Steps are tagged variants so the interpreter dispatches exhaustively and
//! can never meet an unknown kind.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hard ceiling on `max_iterations` for any plan, regardless of what the
/// planner declared. The in-plan value is a hint bounded by this.
pub const ITERATION_CEILING: u32 = 50;

/// One argument of a `tool` step.
///
/// JSON strings are templates and are rendered against the environment
/// before dispatch; every other JSON value is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArgument {
    /// Template string, rendered with `{name}` substitution.
    Template(String),
    /// Literal JSON value, passed to the tool unchanged.
    Literal(serde_json::Value),
}

impl ToolArgument {
    /// True if this argument is a template string.
    pub fn is_template(&self) -> bool {
        matches!(self, ToolArgument::Template(_))
    }
}

/// A single plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Prompt the model and bind the completion text.
    Llm {
        id: String,
        #[serde(default)]
        description: String,
        prompt: String,
        #[serde(default)]
        input_refs: Vec<String>,
        output_name: String,
    },
    /// Dispatch a registered tool and bind its string result.
    Tool {
        id: String,
        #[serde(default)]
        description: String,
        tool_name: String,
        #[serde(default)]
        arguments: IndexMap<String, ToolArgument>,
        #[serde(default)]
        input_refs: Vec<String>,
        output_name: String,
    },
    /// Conditional jump: evaluate `condition`, jump to `goto_id` when true.
    If {
        id: String,
        #[serde(default)]
        description: String,
        condition: String,
        goto_id: String,
    },
    /// Unconditional jump.
    Goto {
        id: String,
        #[serde(default)]
        description: String,
        goto_id: String,
    },
    /// Terminate the execution.
    End {
        id: String,
        #[serde(default)]
        description: String,
    },
}

impl Step {
    /// The step's unique label.
    pub fn id(&self) -> &str {
        match self {
            Step::Llm { id, .. }
            | Step::Tool { id, .. }
            | Step::If { id, .. }
            | Step::Goto { id, .. }
            | Step::End { id, .. } => id,
        }
    }

    /// Free-text description, possibly empty.
    pub fn description(&self) -> &str {
        match self {
            Step::Llm { description, .. }
            | Step::Tool { description, .. }
            | Step::If { description, .. }
            | Step::Goto { description, .. }
            | Step::End { description, .. } => description,
        }
    }

    /// The step kind as its wire tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Llm { .. } => "llm",
            Step::Tool { .. } => "tool",
            Step::If { .. } => "if",
            Step::Goto { .. } => "goto",
            Step::End { .. } => "end",
        }
    }

    /// The variable this step binds, if any.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Step::Llm { output_name, .. } | Step::Tool { output_name, .. } => Some(output_name),
            _ => None,
        }
    }

    /// The jump target, if this step can jump.
    pub fn goto_id(&self) -> Option<&str> {
        match self {
            Step::If { goto_id, .. } | Step::Goto { goto_id, .. } => Some(goto_id),
            _ => None,
        }
    }

    /// Declared variable reads, empty for control-flow steps.
    pub fn input_refs(&self) -> &[String] {
        match self {
            Step::Llm { input_refs, .. } | Step::Tool { input_refs, .. } => input_refs,
            _ => &[],
        }
    }
}

/// A validated, executable plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Ordered step sequence; order is significant (sequential fallthrough).
    pub steps: Vec<Step>,
    /// Planner-declared iteration bound, `1..=ITERATION_CEILING`.
    pub max_iterations: u32,
    /// Planner's free-text rationale; observational only.
    #[serde(default)]
    pub reasoning: String,
}

impl Plan {
    /// Build the step label -> index map.
    ///
    /// Assumes ids are unique (the validator enforces this).
    pub fn index(&self) -> HashMap<&str, usize> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id(), i))
            .collect()
    }

    /// Effective runtime iteration cap: the declared value clamped to the
    /// hard ceiling.
    pub fn effective_cap(&self) -> u32 {
        self.max_iterations.min(ITERATION_CEILING)
    }
}

/// True if `name` matches the identifier grammar `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_plan() -> Plan {
        Plan {
            steps: vec![
                Step::Tool {
                    id: "T1".to_string(),
                    description: "Get the time".to_string(),
                    tool_name: "get_current_time".to_string(),
                    arguments: IndexMap::new(),
                    input_refs: vec![],
                    output_name: "now".to_string(),
                },
                Step::Llm {
                    id: "L1".to_string(),
                    description: "Summarize".to_string(),
                    prompt: "It is {now}. Answer: {user_query}".to_string(),
                    input_refs: vec!["now".to_string(), "user_query".to_string()],
                    output_name: "answer".to_string(),
                },
                Step::End {
                    id: "END".to_string(),
                    description: String::new(),
                },
            ],
            max_iterations: 10,
            reasoning: "time then answer".to_string(),
        }
    }

    #[test]
    fn test_step_accessors() {
        let plan = sample_plan();
        assert_eq!(plan.steps[0].id(), "T1");
        assert_eq!(plan.steps[0].kind(), "tool");
        assert_eq!(plan.steps[0].output_name(), Some("now"));
        assert_eq!(plan.steps[2].kind(), "end");
        assert_eq!(plan.steps[2].output_name(), None);
        assert_eq!(plan.steps[1].input_refs().len(), 2);
    }

    #[test]
    fn test_plan_index() {
        let plan = sample_plan();
        let index = plan.index();
        assert_eq!(index["T1"], 0);
        assert_eq!(index["L1"], 1);
        assert_eq!(index["END"], 2);
    }

    #[test]
    fn test_effective_cap_clamps_to_ceiling() {
        let mut plan = sample_plan();
        plan.max_iterations = 10_000;
        assert_eq!(plan.effective_cap(), ITERATION_CEILING);
        plan.max_iterations = 5;
        assert_eq!(plan.effective_cap(), 5);
    }

    #[test]
    fn test_step_json_tag_round_trip() {
        let step = Step::If {
            id: "C1".to_string(),
            description: String::new(),
            condition: "score >= 8".to_string(),
            goto_id: "END".to_string(),
        };

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "if");
        assert_eq!(json["goto_id"], "END");

        let back: Step = serde_json::from_value(json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_plan_json_round_trip() {
        let plan = sample_plan();
        let json = serde_json::to_value(&plan).unwrap();
        let back: Plan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_unknown_step_type_rejected() {
        let result: Result<Step, _> = serde_json::from_value(json!({
            "type": "teleport",
            "id": "X1",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_argument_string_is_template() {
        let arg: ToolArgument = serde_json::from_value(json!("path is {dir}")).unwrap();
        assert!(arg.is_template());

        let arg: ToolArgument = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(arg, ToolArgument::Literal(json!(42)));

        let arg: ToolArgument = serde_json::from_value(json!({"nested": true})).unwrap();
        assert!(!arg.is_template());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("user_query"));
        assert!(is_identifier("_x9"));
        assert!(is_identifier("A"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("has-dash"));
        assert!(!is_identifier("sp ace"));
    }
}
