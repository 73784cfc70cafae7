//! Tool registry
//!
//! Holds the mapping from tool name to handler plus input schema, validates
//! arguments before dispatch, and isolates handler failures so a broken
//! tool can never take the interpreter down.

use crate::{Result, ToolingError};
use async_trait::async_trait;
use gambit_core::tool::{ToolDispatcher, ToolError, ToolSpec};
use indexmap::IndexMap;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// A capability handler.
///
/// `input_schema` must be an object-form JSON Schema (named properties,
/// optional `required` list, optional `enum` constraints). Handlers return
/// a string - commonly JSON-encoded - or a plain error message.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name, unique.
    fn name(&self) -> &str;

    /// Human-readable purpose; shown to the planner model in the catalog.
    fn description(&self) -> &str;

    /// JSON Schema describing the arguments.
    fn input_schema(&self) -> Value;

    /// Execute with already-validated arguments.
    async fn invoke(&self, args: Value) -> std::result::Result<String, String>;
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    schema: JSONSchema,
    spec: ToolSpec,
}

/// Ordered, schema-validating tool registry.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, compiling its input schema.
    ///
    /// Fails on a duplicate name or a schema that does not compile; both
    /// are programming errors in the tool set, caught at startup.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolingError::General(format!(
                "tool '{}' is already registered",
                name
            )));
        }

        let schema_value = tool.input_schema();
        let schema = JSONSchema::compile(&schema_value).map_err(|e| {
            ToolingError::General(format!("tool '{}' has an invalid schema: {}", name, e))
        })?;

        let spec = ToolSpec {
            name: name.clone(),
            description: tool.description().to_string(),
            input_schema: schema_value,
        };

        debug!(tool = %name, "registered tool");
        self.tools.insert(name, RegisteredTool { tool, schema, spec });
        Ok(())
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

#[async_trait]
impl ToolDispatcher for ToolRegistry {
    async fn dispatch(&self, name: &str, args: Value) -> std::result::Result<String, ToolError> {
        let entry = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        if let Err(violations) = entry.schema.validate(&args) {
            let diagnostic = violations
                .map(|v| {
                    let path = v.instance_path.to_string();
                    if path.is_empty() {
                        v.to_string()
                    } else {
                        format!("{}: {}", path, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ToolError::InvalidArguments {
                tool: name.to_string(),
                diagnostic,
            });
        }

        // Run the handler in its own task so a panic surfaces as a join
        // error instead of unwinding into the interpreter.
        let tool = entry.tool.clone();
        let handle = tokio::spawn(async move { tool.invoke(args).await });

        match handle.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(message)) => Err(ToolError::RuntimeError {
                tool: name.to_string(),
                message,
            }),
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    match join_err.into_panic().downcast::<String>() {
                        Ok(msg) => *msg,
                        Err(payload) => payload
                            .downcast::<&str>()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|_| "handler panicked".to_string()),
                    }
                } else {
                    "handler task aborted".to_string()
                };
                error!(tool = name, %message, "tool handler crashed");
                Err(ToolError::RuntimeError {
                    tool: name.to_string(),
                    message,
                })
            }
        }
    }

    fn catalog(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec.clone()).collect()
    }
}
