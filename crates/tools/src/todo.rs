//! TodoWrite tool: a structured task list the model rewrites as it works.
//!
//! The model always sends the complete list, and the rendered checklist
//! it gets back is the only record of it. Nothing is kept in the tool, so
//! one instance can serve every loop that shares the registry.
//! Constraints: at most 20 items, one `in_progress` item at a time, and
//! every item needs `content`, `status` and `activeForm`.

use async_trait::async_trait;
use serde::Serialize;
use warmloop_core::error::ToolError;
use warmloop_core::tool::{Tool, ToolOutput};

pub const MAX_TODOS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
    #[serde(rename = "activeForm")]
    pub active_form: String,
}

#[derive(Debug, Default)]
pub struct TodoWriteTool;

impl TodoWriteTool {
    pub fn new() -> Self {
        Self
    }
}

/// Check the submitted list and convert it into typed items.
pub fn validate(raw: &[serde_json::Value]) -> Result<Vec<TodoItem>, String> {
    if raw.len() > MAX_TODOS {
        return Err(format!("Max {MAX_TODOS} todos allowed"));
    }

    let mut items = Vec::with_capacity(raw.len());
    for (i, item) in raw.iter().enumerate() {
        let field = |key: &str| item[key].as_str().map(str::trim).unwrap_or("").to_string();

        let content = field("content");
        if content.is_empty() {
            return Err(format!("Item {i}: content required"));
        }
        let raw_status = item["status"].as_str().unwrap_or("pending").to_lowercase();
        let status = TodoStatus::parse(&raw_status)
            .ok_or_else(|| format!("Item {i}: invalid status '{raw_status}'"))?;
        let active_form = field("activeForm");
        if active_form.is_empty() {
            return Err(format!("Item {i}: activeForm required"));
        }

        items.push(TodoItem {
            content,
            status,
            active_form,
        });
    }

    if items.iter().filter(|t| t.status == TodoStatus::InProgress).count() > 1 {
        return Err("Only one task can be in_progress at a time".into());
    }
    Ok(items)
}

/// Checklist view returned to the model.
pub fn render(items: &[TodoItem]) -> String {
    if items.is_empty() {
        return "No todos.".into();
    }

    let mut lines: Vec<String> = items
        .iter()
        .map(|item| match item.status {
            TodoStatus::Completed => format!("[x] {}", item.content),
            TodoStatus::InProgress => format!("[>] {} <- {}", item.content, item.active_form),
            TodoStatus::Pending => format!("[ ] {}", item.content),
        })
        .collect();

    let done = items.iter().filter(|t| t.status == TodoStatus::Completed).count();
    lines.push(format!("\n({done}/{} completed)", items.len()));
    lines.join("\n")
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "TodoWrite"
    }

    fn description(&self) -> &str {
        "Update the task list. Use to plan and track progress on multi-step work."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "description": "Complete list of tasks (replaces existing)",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": { "type": "string", "description": "Task description" },
                            "status": {
                                "type": "string",
                                "enum": ["pending", "in_progress", "completed"]
                            },
                            "activeForm": {
                                "type": "string",
                                "description": "Present tense action, e.g. 'Reading files'"
                            }
                        },
                        "required": ["content", "status", "activeForm"]
                    }
                }
            },
            "required": ["items"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let raw = arguments["items"]
            .as_array()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'items' array".into()))?;

        let items = validate(raw).map_err(ToolError::InvalidArguments)?;
        Ok(ToolOutput::ok(render(&items)))
    }
}
