//! Plan validation
//!
//! Walks planner output (a `serde_json::Value`) into a typed [`Plan`],
//! collecting every structural problem instead of stopping at the first.
//! The full diagnostic list feeds the planner's repair prompt, so partial
//! reporting would directly degrade repair quality.

use crate::condition::Expr;
use crate::plan::{is_identifier, Plan, Step, ToolArgument, ITERATION_CEILING};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Diagnostic severity. Warnings never fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Enumerated validation issue codes. The names are stable and appear in
/// client-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DuplicateId,
    DanglingGoto,
    UnknownStepType,
    DuplicateOutputName,
    MissingRequiredField,
    InvalidIterationCap,
    InvalidCondition,
    UnknownTool,
    InvalidIdentifier,
    UnresolvedInputRef,
}

/// One validation diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanIssue {
    pub code: IssueCode,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    pub message: String,
}

impl PlanIssue {
    fn error(code: IssueCode, step_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            step_id: step_id.map(str::to_string),
            message: message.into(),
        }
    }

    fn warning(code: IssueCode, step_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            step_id: step_id.map(str::to_string),
            message: message.into(),
        }
    }
}

/// True if any issue in the list is an error.
pub fn has_errors(issues: &[PlanIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Parse planner output into a typed plan, validating the structural
/// invariants along the way.
///
/// `catalog` holds the registered tool names; `system_vars` the variables
/// seeded before execution (e.g. `user_query`). On success the returned
/// list holds warnings only; on failure it holds the complete set of
/// errors and warnings.
pub fn parse_and_validate(
    value: &Value,
    catalog: &[String],
    system_vars: &[&str],
) -> Result<(Plan, Vec<PlanIssue>), Vec<PlanIssue>> {
    let mut issues = Vec::new();

    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            issues.push(PlanIssue::error(
                IssueCode::MissingRequiredField,
                None,
                "plan must be a JSON object",
            ));
            return Err(issues);
        }
    };

    let max_iterations = parse_iteration_cap(obj.get("max_iterations"), &mut issues);
    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let raw_steps = match obj.get("steps").and_then(Value::as_array) {
        Some(steps) if !steps.is_empty() => steps,
        _ => {
            issues.push(PlanIssue::error(
                IssueCode::MissingRequiredField,
                None,
                "plan requires a non-empty 'steps' array",
            ));
            return Err(issues);
        }
    };

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw) in raw_steps.iter().enumerate() {
        if let Some(step) = parse_step(index, raw, &mut issues) {
            steps.push(step);
        }
    }

    // Cross-step invariants run over whatever parsed, so one broken step
    // does not hide problems in the others.
    check_cross_step(&steps, catalog, system_vars, &mut issues);

    if has_errors(&issues) {
        return Err(issues);
    }

    Ok((
        Plan {
            steps,
            max_iterations,
            reasoning,
        },
        issues,
    ))
}

/// Validate an already-typed plan (e.g. one an external caller constructed
/// and posted directly to the execution-start operation).
pub fn validate_plan(plan: &Plan, catalog: &[String], system_vars: &[&str]) -> Vec<PlanIssue> {
    let mut issues = Vec::new();

    if plan.max_iterations == 0 || plan.max_iterations > ITERATION_CEILING {
        issues.push(PlanIssue::error(
            IssueCode::InvalidIterationCap,
            None,
            format!(
                "max_iterations must be in 1..={}, got {}",
                ITERATION_CEILING, plan.max_iterations
            ),
        ));
    }
    if plan.steps.is_empty() {
        issues.push(PlanIssue::error(
            IssueCode::MissingRequiredField,
            None,
            "plan requires a non-empty 'steps' array",
        ));
    }

    check_cross_step(&plan.steps, catalog, system_vars, &mut issues);
    issues
}

fn parse_iteration_cap(value: Option<&Value>, issues: &mut Vec<PlanIssue>) -> u32 {
    match value {
        None => {
            issues.push(PlanIssue::error(
                IssueCode::MissingRequiredField,
                None,
                "plan requires 'max_iterations'",
            ));
            0
        }
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 && n <= ITERATION_CEILING as u64 => n as u32,
            _ => {
                issues.push(PlanIssue::error(
                    IssueCode::InvalidIterationCap,
                    None,
                    format!(
                        "max_iterations must be an integer in 1..={}, got {}",
                        ITERATION_CEILING, v
                    ),
                ));
                0
            }
        },
    }
}

fn require_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    field: &str,
    step_id: Option<&str>,
    index: usize,
    issues: &mut Vec<PlanIssue>,
) -> Option<&'a str> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Some(s),
        _ => {
            issues.push(PlanIssue::error(
                IssueCode::MissingRequiredField,
                step_id,
                format!("step #{} is missing required field '{}'", index + 1, field),
            ));
            None
        }
    }
}

fn parse_refs(
    obj: &serde_json::Map<String, Value>,
    step_id: Option<&str>,
    issues: &mut Vec<PlanIssue>,
) -> Vec<String> {
    let mut refs = Vec::new();
    if let Some(array) = obj.get("input_refs").and_then(Value::as_array) {
        for entry in array {
            match entry.as_str() {
                Some(name) if is_identifier(name) => refs.push(name.to_string()),
                Some(name) => issues.push(PlanIssue::error(
                    IssueCode::InvalidIdentifier,
                    step_id,
                    format!("input ref '{}' is not a valid identifier", name),
                )),
                None => issues.push(PlanIssue::error(
                    IssueCode::InvalidIdentifier,
                    step_id,
                    "input_refs entries must be strings",
                )),
            }
        }
    }
    refs
}

fn parse_output_name(
    obj: &serde_json::Map<String, Value>,
    step_id: Option<&str>,
    index: usize,
    issues: &mut Vec<PlanIssue>,
) -> Option<String> {
    let name = require_str(obj, "output_name", step_id, index, issues)?;
    if !is_identifier(name) {
        issues.push(PlanIssue::error(
            IssueCode::InvalidIdentifier,
            step_id,
            format!("output name '{}' is not a valid identifier", name),
        ));
        return None;
    }
    Some(name.to_string())
}

fn parse_step(index: usize, raw: &Value, issues: &mut Vec<PlanIssue>) -> Option<Step> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            issues.push(PlanIssue::error(
                IssueCode::MissingRequiredField,
                None,
                format!("step #{} is not a JSON object", index + 1),
            ));
            return None;
        }
    };

    let id = obj.get("id").and_then(Value::as_str).filter(|s| !s.is_empty());
    if id.is_none() {
        issues.push(PlanIssue::error(
            IssueCode::MissingRequiredField,
            None,
            format!("step #{} is missing required field 'id'", index + 1),
        ));
    }

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let step_type = match obj.get("type").and_then(Value::as_str) {
        Some(t) => t,
        None => {
            issues.push(PlanIssue::error(
                IssueCode::MissingRequiredField,
                id,
                format!("step #{} is missing required field 'type'", index + 1),
            ));
            return None;
        }
    };

    // Check every required field before bailing so one omission does not
    // hide the others from the repair prompt.
    match step_type {
        "llm" => {
            let prompt = require_str(obj, "prompt", id, index, issues);
            let input_refs = parse_refs(obj, id, issues);
            let output_name = parse_output_name(obj, id, index, issues);
            Some(Step::Llm {
                id: id?.to_string(),
                description,
                prompt: prompt?.to_string(),
                input_refs,
                output_name: output_name?,
            })
        }
        "tool" => {
            let tool_name = require_str(obj, "tool_name", id, index, issues);
            let mut arguments = IndexMap::new();
            if let Some(args) = obj.get("arguments").and_then(Value::as_object) {
                for (key, value) in args {
                    let arg = match value {
                        Value::String(s) => ToolArgument::Template(s.clone()),
                        other => ToolArgument::Literal(other.clone()),
                    };
                    arguments.insert(key.clone(), arg);
                }
            }
            let input_refs = parse_refs(obj, id, issues);
            let output_name = parse_output_name(obj, id, index, issues);
            Some(Step::Tool {
                id: id?.to_string(),
                description,
                tool_name: tool_name?.to_string(),
                arguments,
                input_refs,
                output_name: output_name?,
            })
        }
        "if" => {
            let condition = require_str(obj, "condition", id, index, issues);
            let goto_id = require_str(obj, "goto_id", id, index, issues);
            Some(Step::If {
                id: id?.to_string(),
                description,
                condition: condition?.to_string(),
                goto_id: goto_id?.to_string(),
            })
        }
        "goto" => {
            let goto_id = require_str(obj, "goto_id", id, index, issues);
            Some(Step::Goto {
                id: id?.to_string(),
                description,
                goto_id: goto_id?.to_string(),
            })
        }
        "end" => Some(Step::End {
            id: id?.to_string(),
            description,
        }),
        other => {
            issues.push(PlanIssue::error(
                IssueCode::UnknownStepType,
                id,
                format!("step #{} has unknown type '{}'", index + 1, other),
            ));
            None
        }
    }
}

fn check_cross_step(
    steps: &[Step],
    catalog: &[String],
    system_vars: &[&str],
    issues: &mut Vec<PlanIssue>,
) {
    // Unique ids.
    let mut seen_ids = HashSet::new();
    for step in steps {
        if !seen_ids.insert(step.id()) {
            issues.push(PlanIssue::error(
                IssueCode::DuplicateId,
                Some(step.id()),
                format!("step id '{}' is used more than once", step.id()),
            ));
        }
    }

    // Goto targets resolve.
    let ids: HashSet<&str> = steps.iter().map(Step::id).collect();
    for step in steps {
        if let Some(target) = step.goto_id() {
            if !ids.contains(target) {
                issues.push(PlanIssue::error(
                    IssueCode::DanglingGoto,
                    Some(step.id()),
                    format!("goto target '{}' does not name a step", target),
                ));
            }
        }
    }

    // Output names are write-once across the plan.
    let mut outputs: HashMap<&str, &str> = HashMap::new();
    for step in steps {
        if let Some(name) = step.output_name() {
            if let Some(first) = outputs.get(name) {
                issues.push(PlanIssue::error(
                    IssueCode::DuplicateOutputName,
                    Some(step.id()),
                    format!(
                        "output name '{}' is already bound by step '{}'",
                        name, first
                    ),
                ));
            } else {
                outputs.insert(name, step.id());
            }
        }
    }

    // Tool names must be in the catalog.
    for step in steps {
        if let Step::Tool { tool_name, .. } = step {
            if !catalog.iter().any(|t| t == tool_name) {
                issues.push(PlanIssue::error(
                    IssueCode::UnknownTool,
                    Some(step.id()),
                    format!("tool '{}' is not in the catalog", tool_name),
                ));
            }
        }
    }

    // Conditions parse.
    for step in steps {
        if let Step::If { condition, .. } = step {
            if let Err(e) = Expr::parse(condition) {
                issues.push(PlanIssue::error(
                    IssueCode::InvalidCondition,
                    Some(step.id()),
                    e.to_string(),
                ));
            }
        }
    }

    // Input refs resolve against earlier outputs or system variables, in
    // written order. Best-effort only: a miss is a warning, and the
    // runtime substitutes the empty string.
    let mut bound: HashSet<&str> = system_vars.iter().copied().collect();
    for step in steps {
        for input_ref in step.input_refs() {
            if !bound.contains(input_ref.as_str()) {
                issues.push(PlanIssue::warning(
                    IssueCode::UnresolvedInputRef,
                    Some(step.id()),
                    format!(
                        "input ref '{}' is not bound by any earlier step",
                        input_ref
                    ),
                ));
            }
        }
        if let Some(name) = step.output_name() {
            bound.insert(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Vec<String> {
        vec!["get_current_time".to_string(), "list_files".to_string()]
    }

    const SYSTEM_VARS: &[&str] = &["user_query"];

    fn good_plan_json() -> Value {
        json!({
            "reasoning": "fetch the time, then answer",
            "max_iterations": 10,
            "steps": [
                {
                    "type": "tool",
                    "id": "T1",
                    "description": "Get the current time",
                    "tool_name": "get_current_time",
                    "arguments": {"format": "iso"},
                    "input_refs": [],
                    "output_name": "now"
                },
                {
                    "type": "llm",
                    "id": "L1",
                    "description": "Answer using the time",
                    "prompt": "It is {now}. {user_query}",
                    "input_refs": ["now", "user_query"],
                    "output_name": "answer"
                },
                {"type": "end", "id": "END", "description": "done"}
            ]
        })
    }

    #[test]
    fn test_accepts_valid_plan() {
        let (plan, warnings) =
            parse_and_validate(&good_plan_json(), &catalog(), SYSTEM_VARS).unwrap();
        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.max_iterations, 10);
        assert!(warnings.is_empty());
        assert_eq!(plan.steps[0].id(), "T1");
    }

    #[test]
    fn test_round_trip_is_identity() {
        let (plan, _) = parse_and_validate(&good_plan_json(), &catalog(), SYSTEM_VARS).unwrap();
        let json = serde_json::to_value(&plan).unwrap();
        let back: Plan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_duplicate_id_reported() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "end", "id": "A"},
                {"type": "end", "id": "A"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::DuplicateId));
    }

    #[test]
    fn test_dangling_goto_reported() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "goto", "id": "G1", "goto_id": "NOWHERE"},
                {"type": "end", "id": "END"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::DanglingGoto));
    }

    #[test]
    fn test_unknown_step_type_reported() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "teleport", "id": "X"},
                {"type": "end", "id": "END"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::UnknownStepType));
    }

    #[test]
    fn test_duplicate_output_name_reported() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "llm", "id": "L1", "prompt": "a", "output_name": "x"},
                {"type": "llm", "id": "L2", "prompt": "b", "output_name": "x"},
                {"type": "end", "id": "END"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::DuplicateOutputName));
    }

    #[test]
    fn test_iteration_cap_bounds() {
        for bad in [json!(0), json!(1000), json!("ten"), json!(-2)] {
            let value = json!({
                "max_iterations": bad,
                "steps": [{"type": "end", "id": "END"}]
            });
            let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
            assert!(
                issues.iter().any(|i| i.code == IssueCode::InvalidIterationCap),
                "expected invalid_iteration_cap for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_missing_max_iterations_reported() {
        let value = json!({"steps": [{"type": "end", "id": "END"}]});
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::MissingRequiredField));
    }

    #[test]
    fn test_unknown_tool_reported() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "tool", "id": "T1", "tool_name": "launch_rockets",
                 "output_name": "x"},
                {"type": "end", "id": "END"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::UnknownTool));
    }

    #[test]
    fn test_invalid_condition_reported() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "if", "id": "C1", "condition": "score >= ", "goto_id": "END"},
                {"type": "end", "id": "END"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        assert!(issues.iter().any(|i| i.code == IssueCode::InvalidCondition));
    }

    #[test]
    fn test_unresolved_ref_is_warning_only() {
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "llm", "id": "L1", "prompt": "{ghost}",
                 "input_refs": ["ghost"], "output_name": "out"},
                {"type": "end", "id": "END"}
            ]
        });
        let (_, warnings) = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap();
        assert!(warnings
            .iter()
            .any(|i| i.code == IssueCode::UnresolvedInputRef
                && i.severity == Severity::Warning));
    }

    #[test]
    fn test_refs_resolve_in_written_order_not_execution_order() {
        // L2 is written after T1 even though a goto would run them in a
        // different order; static validation uses the written sequence.
        let value = json!({
            "max_iterations": 5,
            "steps": [
                {"type": "tool", "id": "T1", "tool_name": "get_current_time",
                 "output_name": "now"},
                {"type": "llm", "id": "L2", "prompt": "{now}",
                 "input_refs": ["now"], "output_name": "said"},
                {"type": "end", "id": "END"}
            ]
        });
        let (_, warnings) = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let value = json!({
            "max_iterations": 0,
            "steps": [
                {"type": "tool", "id": "T1", "tool_name": "nope", "output_name": "x"},
                {"type": "tool", "id": "T1", "tool_name": "nope2", "output_name": "x"},
                {"type": "goto", "id": "G", "goto_id": "MISSING"}
            ]
        });
        let issues = parse_and_validate(&value, &catalog(), SYSTEM_VARS).unwrap_err();
        let codes: HashSet<IssueCode> = issues.iter().map(|i| i.code).collect();
        assert!(codes.contains(&IssueCode::InvalidIterationCap));
        assert!(codes.contains(&IssueCode::DuplicateId));
        assert!(codes.contains(&IssueCode::DuplicateOutputName));
        assert!(codes.contains(&IssueCode::UnknownTool));
        assert!(codes.contains(&IssueCode::DanglingGoto));
    }

    #[test]
    fn test_validate_typed_plan() {
        let (plan, _) = parse_and_validate(&good_plan_json(), &catalog(), SYSTEM_VARS).unwrap();
        assert!(validate_plan(&plan, &catalog(), SYSTEM_VARS).is_empty());

        let mut broken = plan;
        broken.max_iterations = 0;
        let issues = validate_plan(&broken, &catalog(), SYSTEM_VARS);
        assert!(issues.iter().any(|i| i.code == IssueCode::InvalidIterationCap));
    }

    #[test]
    fn test_issue_serialization_uses_snake_case() {
        let issue = PlanIssue::error(IssueCode::DanglingGoto, Some("G1"), "nope");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["code"], "dangling_goto");
        assert_eq!(json["severity"], "error");
    }
}
