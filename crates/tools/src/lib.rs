//! Built-in tool implementations for warmloop.
//!
//! Tools give the agent the ability to interact with the workspace:
//! run shell commands, read, write and edit files, and keep a task list.
//! The `Skill` and `Task` tools are not here; they are protocol handlers
//! owned by the agent's dispatcher.

pub mod file_edit;
pub mod file_read;
pub mod file_write;
pub mod sandbox;
pub mod shell;
pub mod todo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use warmloop_core::error::ToolError;
use warmloop_core::tool::ToolRegistry;

pub use sandbox::{SandboxError, Workspace};

/// Settings for the built-in tool set.
#[derive(Debug, Clone)]
pub struct BuiltinToolsConfig {
    pub workdir: PathBuf,
    pub workspace_only: bool,
    pub allowed_commands: Vec<String>,
    pub denied_patterns: Vec<String>,
    pub timeout: Duration,
}

impl BuiltinToolsConfig {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            workspace_only: true,
            allowed_commands: Vec::new(),
            denied_patterns: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Create a registry with all built-in tools.
///
/// Registration order is fixed (`bash`, `read_file`, `write_file`,
/// `edit_file`, `TodoWrite`) so the catalog is identical across runs.
pub fn default_registry(config: &BuiltinToolsConfig) -> Result<ToolRegistry, ToolError> {
    let workspace = Workspace::new(&config.workdir, config.workspace_only);
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(
        shell::BashTool::new(workspace.root(), config.timeout)
            .with_allowed_commands(config.allowed_commands.clone())
            .with_denied_patterns(config.denied_patterns.clone()),
    ))?;
    registry.register(Arc::new(file_read::ReadFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(file_write::WriteFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(file_edit::EditFileTool::new(workspace)))?;
    registry.register(Arc::new(todo::TodoWriteTool::new()))?;

    Ok(registry)
}
