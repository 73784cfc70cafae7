//! LLM-backed planner
//!
//! Composes a planning prompt from the user query and the tool catalog,
//! asks the model for a JSON plan, and pushes the result through the
//! extractor and validator. A failed attempt earns exactly one structured
//! repair round; the repair prompt carries the previous output and the
//! complete diagnostic list.

use crate::error::{OrchestratorError, Result};
use crate::extract::extract_object;
use gambit_core::model::{CompletionModel, CompletionRequest};
use gambit_core::plan::{Plan, ITERATION_CEILING};
use gambit_core::tool::ToolSpec;
use gambit_core::validate::{parse_and_validate, PlanIssue};
use gambit_core::USER_QUERY_VAR;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tokio_util::sync::CancellationToken;
use tooling::config::EngineConfig;
use tracing::{debug, info, warn};

/// Variables seeded by the execution starter, visible to static ref checks.
pub const SYSTEM_VARS: &[&str] = &[USER_QUERY_VAR];

/// Produces validated plans from natural-language queries.
pub struct Planner {
    model: Arc<dyn CompletionModel>,
    config: EngineConfig,
    bpe: CoreBPE,
}

impl Planner {
    /// Create a planner over a completion model.
    pub fn new(model: Arc<dyn CompletionModel>, config: EngineConfig) -> Self {
        let bpe = cl100k_base().expect("embedded BPE data is valid");
        Self { model, config, bpe }
    }

    /// Plan a query against the given tool catalog.
    pub async fn plan(&self, query: &str, catalog: &[ToolSpec]) -> Result<Plan> {
        let system_prompt = self.system_prompt(catalog);
        self.check_budget(&system_prompt, query)?;

        let catalog_names: Vec<String> = catalog.iter().map(|t| t.name.clone()).collect();
        let cancel = CancellationToken::new();

        let request = CompletionRequest::new(query)
            .with_system_prompt(system_prompt.clone())
            .with_temperature(0.0);
        let output = self.model.complete(request, &cancel).await?;

        let (first_error, diagnostics) = match self.try_parse(&output, &catalog_names) {
            Ok(plan) => {
                info!(steps = plan.steps.len(), "planner produced a valid plan");
                return Ok(plan);
            }
            Err((message, diagnostics)) => (message, diagnostics),
        };

        warn!(%first_error, issues = diagnostics.len(), "plan rejected; attempting repair");

        let repair = repair_prompt(&output, &first_error, &diagnostics);
        let request = CompletionRequest::new(repair)
            .with_system_prompt(system_prompt)
            .with_temperature(0.0);
        let output = self.model.complete(request, &cancel).await?;

        match self.try_parse(&output, &catalog_names) {
            Ok(plan) => {
                info!(steps = plan.steps.len(), "repair round produced a valid plan");
                Ok(plan)
            }
            Err((message, diagnostics)) => Err(OrchestratorError::PlannerUnrecoverable {
                message,
                diagnostics,
            }),
        }
    }

    fn try_parse(
        &self,
        output: &str,
        catalog_names: &[String],
    ) -> std::result::Result<Plan, (String, Vec<PlanIssue>)> {
        let value = match extract_object(output) {
            Ok(value) => value,
            Err(e) => return Err((e.to_string(), Vec::new())),
        };

        match parse_and_validate(&value, catalog_names, SYSTEM_VARS) {
            Ok((plan, warnings)) => {
                for warning in &warnings {
                    debug!(code = ?warning.code, %warning.message, "plan warning");
                }
                Ok(plan)
            }
            Err(issues) => {
                let summary = issues
                    .iter()
                    .map(|i| i.message.clone())
                    .collect::<Vec<_>>()
                    .join("; ");
                Err((format!("plan failed validation: {}", summary), issues))
            }
        }
    }

    fn check_budget(&self, system_prompt: &str, query: &str) -> Result<()> {
        let budget = self.config.prompt_token_budget();
        let tokens = self.bpe.encode_with_special_tokens(system_prompt).len()
            + self.bpe.encode_with_special_tokens(query).len();
        if tokens > budget {
            return Err(OrchestratorError::PromptBudgetExceeded { tokens, budget });
        }
        Ok(())
    }

    fn system_prompt(&self, catalog: &[ToolSpec]) -> String {
        let mut prompt = String::new();
        prompt.push_str(
            "You are a planning assistant. Turn the user's request into an \
             execution plan and answer with a single JSON object - no prose, \
             no code fences.\n\n",
        );
        prompt.push_str(
            "The object has exactly these fields:\n\
             - \"reasoning\": short text explaining the plan\n\
             - \"max_iterations\": integer, how many steps the plan may execute\n\
             - \"steps\": array of step objects\n\n",
        );
        prompt.push_str(
            "Each step has an \"id\" (unique short label), a \"type\", a \
             \"description\", and type-specific fields:\n\
             - type \"llm\": \"prompt\" (may reference variables as {name}), \
             \"input_refs\" (array of variable names the prompt reads), \
             \"output_name\" (variable bound to the completion)\n\
             - type \"tool\": \"tool_name\", \"arguments\" (object; string \
             values may reference variables as {name}), \"input_refs\", \
             \"output_name\"\n\
             - type \"if\": \"condition\" (e.g. \"score >= 8\"), \"goto_id\" \
             (step to jump to when true)\n\
             - type \"goto\": \"goto_id\"\n\
             - type \"end\": no extra fields\n\n",
        );
        prompt.push_str(
            "Rules:\n\
             - Steps run top to bottom unless an \"if\" or \"goto\" jumps.\n\
             - Every \"goto_id\" must name an existing step id.\n\
             - Every \"output_name\" must be unique; variables are write-once.\n\
             - \"input_refs\" must list exactly the variables a step reads; \
             the variable \"user_query\" holds the user's request and is \
             always available.\n\
             - Finish with an \"end\" step.\n",
        );
        prompt.push_str(&format!(
            "- \"max_iterations\" must be at most {}; prefer {}.\n\n",
            ITERATION_CEILING, self.config.max_agent_iterations
        ));

        if catalog.is_empty() {
            prompt.push_str("No tools are available; use only llm steps.\n");
        } else {
            prompt.push_str(
                "Available tools - use ONLY these, never invent a tool name:\n",
            );
            for spec in catalog {
                prompt.push_str(&format!(
                    "- {}: {} (parameters: {})\n",
                    spec.name,
                    spec.description,
                    describe_parameters(&spec.input_schema)
                ));
            }
        }

        prompt
    }
}

/// Summarize a tool's schema as `name: type` pairs for the prompt.
fn describe_parameters(schema: &serde_json::Value) -> String {
    let properties = match schema.get("properties").and_then(|p| p.as_object()) {
        Some(props) if !props.is_empty() => props,
        _ => return "none".to_string(),
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let ty = prop.get("type").and_then(|t| t.as_str()).unwrap_or("any");
            if required.contains(&name.as_str()) {
                format!("{}: {} (required)", name, ty)
            } else {
                format!("{}: {}", name, ty)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn repair_prompt(previous: &str, error: &str, issues: &[PlanIssue]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Your previous plan was rejected. Produce a corrected plan as a \
         single JSON object, fixing every problem listed below.\n\n",
    );
    prompt.push_str("Previous output:\n");
    prompt.push_str(previous);
    prompt.push_str("\n\nProblems:\n");
    prompt.push_str(&format!("- {}\n", error));
    for issue in issues {
        prompt.push_str(&format!("- {}\n", issue.message));
    }
    prompt
}
