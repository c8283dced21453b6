//! File write tool: create or overwrite files inside the workspace.

use async_trait::async_trait;
use warmloop_core::error::ToolError;
use warmloop_core::tool::{Tool, ToolOutput};

use crate::sandbox::Workspace;

pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates parent directories; overwrites an existing file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "write_file".into(),
                reason: e.to_string(),
            })?;

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolOutput::failed(format!("Failed to create directories: {e}")));
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => Ok(ToolOutput::ok(format!(
                "Wrote {} bytes to {path}",
                content.len()
            ))),
            Err(e) => Ok(ToolOutput::failed(format!("Failed to write file: {e}"))),
        }
    }
}
