//! Built-in tools.

mod files;
mod time;

pub use files::ListFilesTool;
pub use time::CurrentTimeTool;

use crate::config::EngineConfig;
use crate::registry::ToolRegistry;
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Build a registry holding the built-in tool set.
pub fn builtin_registry(config: &EngineConfig, workspace_root: PathBuf) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CurrentTimeTool))?;
    registry.register(Arc::new(ListFilesTool::new(
        workspace_root,
        config.list_files_limit,
    )))?;
    Ok(registry)
}
