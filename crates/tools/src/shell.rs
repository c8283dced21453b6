//! Bash tool: execute shell commands in the workspace.
//!
//! Supports a deny-list, an optional command allowlist, and a timeout.
//! The child is killed if the call times out or the run is cancelled.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use warmloop_core::error::ToolError;
use warmloop_core::tool::{Tool, ToolOutput};

/// Execute shell commands with safety constraints.
pub struct BashTool {
    workdir: PathBuf,
    /// If non-empty, only these base commands are allowed.
    allowed_commands: Vec<String>,
    /// Substrings that refuse a command outright.
    denied_patterns: Vec<String>,
    timeout: Duration,
}

impl BashTool {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            allowed_commands: Vec::new(),
            denied_patterns: Vec::new(),
            timeout,
        }
    }

    pub fn with_allowed_commands(mut self, allowed: Vec<String>) -> Self {
        self.allowed_commands = allowed;
        self
    }

    pub fn with_denied_patterns(mut self, denied: Vec<String>) -> Self {
        self.denied_patterns = denied;
        self
    }

    fn denied_pattern(&self, command: &str) -> Option<&str> {
        self.denied_patterns
            .iter()
            .find(|p| command.contains(p.as_str()))
            .map(String::as_str)
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace and return stdout/stderr. Use for ls, find, grep, git, running programs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if let Some(pattern) = self.denied_pattern(command) {
            warn!(command = %command, pattern = %pattern, "Dangerous command blocked");
            return Err(ToolError::PermissionDenied {
                tool_name: "bash".into(),
                reason: format!("Dangerous command blocked (matches '{pattern}')"),
            });
        }

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: "bash".into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        debug!(command = %command, "Executing shell command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&self.workdir).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                tool_name: "bash".into(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                warn!(
                    command = %command,
                    timeout_secs = self.timeout.as_secs(),
                    "Command timed out"
                );
                return Err(ToolError::Timeout {
                    tool_name: "bash".into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{stdout}{stderr}");
        let combined = combined.trim();
        let text = if combined.is_empty() { "(no output)" } else { combined };

        if output.status.success() {
            Ok(ToolOutput::ok(text))
        } else {
            let code = output.status.code().unwrap_or(-1);
            debug!(command = %command, exit_code = code, "Command exited non-zero");
            Ok(ToolOutput::failed(format!("[exit code: {code}]\n{text}")))
        }
    }
}
