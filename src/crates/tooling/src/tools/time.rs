//! Current-time tool.

use crate::registry::Tool;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

/// Reports the current UTC wall-clock time.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current UTC date and time"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["iso", "unix", "human"],
                    "description": "Output format; defaults to iso"
                }
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, String> {
        let now = Utc::now();
        let formatted = match args.get("format").and_then(Value::as_str).unwrap_or("iso") {
            "unix" => now.timestamp().to_string(),
            "human" => now.format("%A, %B %e, %Y at %H:%M:%S UTC").to_string(),
            _ => now.to_rfc3339(),
        };
        Ok(formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_format_is_rfc3339() {
        let out = CurrentTimeTool.invoke(json!({})).await.unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&out).is_ok());
    }

    #[tokio::test]
    async fn test_unix_format() {
        let out = CurrentTimeTool
            .invoke(json!({"format": "unix"}))
            .await
            .unwrap();
        assert!(out.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn test_human_format() {
        let out = CurrentTimeTool
            .invoke(json!({"format": "human"}))
            .await
            .unwrap();
        assert!(out.contains("UTC"));
    }

    #[test]
    fn test_schema_enumerates_formats() {
        let schema = CurrentTimeTool.input_schema();
        let formats = schema["properties"]["format"]["enum"].as_array().unwrap();
        assert_eq!(formats.len(), 3);
    }
}
