//! File edit tool: replace one exact text span in a workspace file.

use async_trait::async_trait;
use warmloop_core::error::ToolError;
use warmloop_core::tool::{Tool, ToolOutput};

use crate::sandbox::Workspace;

pub struct EditFileTool {
    workspace: Workspace,
}

impl EditFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Replace the first occurrence of exact text in a file."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path, relative to the workspace" },
                "old_text": { "type": "string", "description": "Exact text to find" },
                "new_text": { "type": "string", "description": "Replacement text" }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let arg = |key: &str| {
            arguments[key]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
        };
        let path = arg("path")?;
        let old_text = arg("old_text")?;
        let new_text = arg("new_text")?;

        if old_text.is_empty() {
            return Err(ToolError::InvalidArguments("'old_text' must not be empty".into()));
        }

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "edit_file".into(),
                reason: e.to_string(),
            })?;

        let text = match tokio::fs::read_to_string(&resolved).await {
            Ok(t) => t,
            Err(e) => return Ok(ToolOutput::failed(format!("Failed to read file: {e}"))),
        };

        if !text.contains(old_text) {
            return Ok(ToolOutput::failed(format!("Text not found in {path}")));
        }

        let edited = text.replacen(old_text, new_text, 1);
        match tokio::fs::write(&resolved, edited).await {
            Ok(()) => Ok(ToolOutput::ok(format!("Edited {path}"))),
            Err(e) => Ok(ToolOutput::failed(format!("Failed to write file: {e}"))),
        }
    }
}
