//! File read tool: read file contents inside the workspace.

use async_trait::async_trait;
use warmloop_core::error::ToolError;
use warmloop_core::tool::{Tool, ToolOutput};

use crate::sandbox::Workspace;

pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read file contents, optionally only the first `limit` lines."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the workspace"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to return"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let limit = arguments["limit"].as_u64().map(|n| n as usize);

        let resolved = self
            .workspace
            .resolve(path)
            .map_err(|e| ToolError::PermissionDenied {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            })?;

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => return Ok(ToolOutput::failed(format!("Failed to read file: {e}"))),
        };

        let text = match limit {
            Some(limit) => {
                let lines: Vec<&str> = content.lines().collect();
                if limit < lines.len() {
                    let mut shown = lines[..limit].join("\n");
                    shown.push_str(&format!("\n... ({} more lines)", lines.len() - limit));
                    shown
                } else {
                    lines.join("\n")
                }
            }
            None => content,
        };

        Ok(ToolOutput::ok(text))
    }
}
