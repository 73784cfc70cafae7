//! File-listing tool.

use crate::registry::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

/// Lists directory entries under a fixed workspace root.
///
/// Paths are resolved relative to the root and may not escape it; the
/// result is a JSON array of entry names, capped at the configured limit.
pub struct ListFilesTool {
    root: PathBuf,
    limit: usize,
}

impl ListFilesTool {
    /// Create a tool rooted at `root`, returning at most `limit` entries.
    pub fn new(root: PathBuf, limit: usize) -> Self {
        Self { root, limit }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, String> {
        let requested = Path::new(relative);
        if requested.is_absolute() {
            return Err(format!("path '{}' must be relative", relative));
        }
        for component in requested.components() {
            if matches!(component, Component::ParentDir) {
                return Err(format!("path '{}' escapes the workspace root", relative));
            }
        }
        Ok(self.root.join(requested))
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files in a directory under the workspace root"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory relative to the workspace root; defaults to the root itself"
                }
            }
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, String> {
        let relative = args.get("path").and_then(Value::as_str).unwrap_or("");
        let directory = self.resolve(relative)?;

        let mut names: Vec<String> = std::fs::read_dir(&directory)
            .map_err(|e| format!("cannot read '{}': {}", directory.display(), e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names.truncate(self.limit);

        serde_json::to_string(&names).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tool_over_tempdir(limit: usize) -> (tempfile::TempDir, ListFilesTool) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.txt"), "i").unwrap();
        let tool = ListFilesTool::new(dir.path().to_path_buf(), limit);
        (dir, tool)
    }

    #[tokio::test]
    async fn test_lists_sorted_entries() {
        let (_dir, tool) = tool_over_tempdir(20);
        let out = tool.invoke(json!({})).await.unwrap();
        let names: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt", "sub"]);
    }

    #[tokio::test]
    async fn test_limit_applies() {
        let (_dir, tool) = tool_over_tempdir(2);
        let out = tool.invoke(json!({})).await.unwrap();
        let names: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn test_subdirectory_listing() {
        let (_dir, tool) = tool_over_tempdir(20);
        let out = tool.invoke(json!({"path": "sub"})).await.unwrap();
        let names: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(names, vec!["inner.txt"]);
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let (_dir, tool) = tool_over_tempdir(20);
        let err = tool.invoke(json!({"path": "../outside"})).await.unwrap_err();
        assert!(err.contains("escapes"));
    }

    #[tokio::test]
    async fn test_absolute_path_rejected() {
        let (_dir, tool) = tool_over_tempdir(20);
        let err = tool.invoke(json!({"path": "/etc"})).await.unwrap_err();
        assert!(err.contains("must be relative"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_handler_error() {
        let (_dir, tool) = tool_over_tempdir(20);
        let err = tool.invoke(json!({"path": "nope"})).await.unwrap_err();
        assert!(err.contains("cannot read"));
    }
}
