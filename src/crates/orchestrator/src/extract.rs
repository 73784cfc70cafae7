//! JSON extraction from model output
//!
//! Planner models are asked for bare JSON but routinely wrap it in code
//! fences or prose. This module strips the wrapping, finds the first
//! balanced `{...}` span (string- and escape-aware), and parses it.

use crate::error::OrchestratorError;
use serde_json::Value;

/// Extract the first JSON object from free-form model output.
pub fn extract_object(text: &str) -> Result<Value, OrchestratorError> {
    let stripped = strip_fences(text);
    let (start, candidate) = balanced_object_span(stripped).ok_or_else(|| {
        OrchestratorError::MalformedJson {
            position: 0,
            message: "no JSON object found in model output".to_string(),
        }
    })?;

    serde_json::from_str(candidate).map_err(|e| OrchestratorError::MalformedJson {
        position: start + e.column().saturating_sub(1),
        message: e.to_string(),
    })
}

/// Drop a surrounding ```json / ``` fence, if present.
fn strip_fences(text: &str) -> &str {
    for marker in ["```json", "```JSON", "```"] {
        if let Some(open) = text.find(marker) {
            let body = &text[open + marker.len()..];
            if let Some(close) = body.find("```") {
                return body[..close].trim();
            }
        }
    }
    text
}

/// Locate the first balanced top-level object, returning its byte offset
/// within `text` and the span itself. Braces inside string literals do not
/// count toward nesting.
fn balanced_object_span(text: &str) -> Option<(usize, &str)> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, &text[start..start + offset + 1]));
                }
            }
            _ => {}
        }
    }

    // Unbalanced: hand the remainder to the parser for a positioned error.
    Some((start, &text[start..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_object() {
        let value = extract_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_object_with_prose_around() {
        let text = r#"Here is the plan you asked for: {"a": 1} hope it helps!"#;
        assert_eq!(extract_object(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_fenced_object() {
        let text = "Sure!\n```json\n{\"steps\": []}\n```\nDone.";
        assert_eq!(extract_object(text).unwrap(), json!({"steps": []}));
    }

    #[test]
    fn test_plain_fence() {
        let text = "```\n{\"a\": true}\n```";
        assert_eq!(extract_object(text).unwrap(), json!({"a": true}));
    }

    #[test]
    fn test_nested_objects_balance() {
        let text = r#"{"outer": {"inner": {"deep": 1}}} trailing {"second": 2}"#;
        assert_eq!(
            extract_object(text).unwrap(),
            json!({"outer": {"inner": {"deep": 1}}})
        );
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"template": "hello {name}", "n": 1}"#;
        let value = extract_object(text).unwrap();
        assert_eq!(value["template"], "hello {name}");
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"{"quote": "she said \"{hi}\"", "n": 2}"#;
        let value = extract_object(text).unwrap();
        assert_eq!(value["n"], 2);
    }

    #[test]
    fn test_no_object_is_malformed_json() {
        let err = extract_object("no json here at all").unwrap_err();
        assert_eq!(err.kind(), "malformed_json");
    }

    #[test]
    fn test_unbalanced_object_reports_position() {
        let err = extract_object(r#"{"a": [1, 2"#).unwrap_err();
        match err {
            OrchestratorError::MalformedJson { position, .. } => assert!(position > 0),
            other => panic!("expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_in_balanced_span() {
        let err = extract_object(r#"{"a": 1,}"#);
        // Trailing commas are rejected by the parser.
        assert!(err.is_err());
    }
}
