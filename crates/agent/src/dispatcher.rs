//! Tool dispatcher: a closed table mapping tool names to handlers.
//!
//! Three kinds of handler exist. Ordinary tools come from a
//! [`ToolRegistry`]; `Skill` injects a knowledge package body as tool
//! result text; `Task` runs a subagent to completion and returns its
//! answer. The table and the catalog advertised to the model are both
//! fixed when the dispatcher is built.
//!
//! Handler failures never escape as errors. Every invocation yields
//! exactly one [`ToolResult`], flagged `is_error` when something went
//! wrong, so the model can read the failure and react.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};
use warmloop_core::error::ToolError;
use warmloop_core::event::{DomainEvent, EventBus};
use warmloop_core::provider::ToolDefinition;
use warmloop_core::tool::{ToolCall, ToolRegistry, ToolResult};
use warmloop_skills::SkillRegistry;

use crate::agent_types::AgentTypes;
use crate::outcome::LoopOutcome;
use crate::run_context::RunContext;
use crate::subagent::{SubagentSpawner, SubagentTask};

/// Name of the knowledge-load tool.
pub const SKILL_TOOL: &str = "Skill";
/// Name of the subagent-spawn tool.
pub const TASK_TOOL: &str = "Task";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    Ordinary,
    Skill,
    Task,
}

/// Knobs that shape how results are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Upper bound, in characters, on the text of any single result
    pub max_output_chars: usize,
    /// Run the invocations of one response concurrently
    pub parallel: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_output_chars: 50_000,
            parallel: true,
        }
    }
}

pub struct Dispatcher {
    tools: ToolRegistry,
    skills: Arc<SkillRegistry>,
    spawner: Option<SubagentSpawner>,
    handlers: HashMap<String, Handler>,
    catalog: Arc<[ToolDefinition]>,
    settings: DispatchSettings,
    events: Arc<EventBus>,
}

impl Dispatcher {
    /// Build the handler table and freeze the catalog.
    ///
    /// `Task` is only offered when a spawner is supplied. Ordinary tools
    /// may not reuse the reserved names.
    pub fn new(
        tools: ToolRegistry,
        skills: Arc<SkillRegistry>,
        spawner: Option<SubagentSpawner>,
        settings: DispatchSettings,
        events: Arc<EventBus>,
    ) -> Result<Self, ToolError> {
        let mut handlers = HashMap::new();
        for name in tools.names() {
            if name == SKILL_TOOL || name == TASK_TOOL {
                return Err(ToolError::DuplicateTool(name.to_string()));
            }
            handlers.insert(name.to_string(), Handler::Ordinary);
        }

        let mut catalog = tools.definitions();
        handlers.insert(SKILL_TOOL.to_string(), Handler::Skill);
        catalog.push(skill_definition(&skills));
        if let Some(spawner) = &spawner {
            handlers.insert(TASK_TOOL.to_string(), Handler::Task);
            catalog.push(task_definition(spawner.agent_types()));
        }

        Ok(Self {
            tools,
            skills,
            spawner,
            handlers,
            catalog: catalog.into(),
            settings,
            events,
        })
    }

    /// The tool declarations sent with every model call, always the same
    /// allocation for the life of the dispatcher.
    pub fn catalog(&self) -> Arc<[ToolDefinition]> {
        Arc::clone(&self.catalog)
    }

    pub fn names(&self) -> Vec<&str> {
        self.catalog.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Run every invocation of one response. Results come back in
    /// invocation order whether or not they ran concurrently.
    pub async fn dispatch_all(&self, calls: &[ToolCall], ctx: &RunContext) -> Vec<ToolResult> {
        if self.settings.parallel && calls.len() > 1 {
            join_all(calls.iter().map(|call| self.dispatch(call, ctx))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.dispatch(call, ctx).await);
            }
            results
        }
    }

    /// Run a single invocation.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &RunContext) -> ToolResult {
        let start = Instant::now();
        debug!(tool = %call.name, call_id = %call.id, depth = ctx.depth(), "Dispatching tool call");

        let (success, content) = match self.handlers.get(call.name.as_str()) {
            Some(Handler::Ordinary) => self.run_ordinary(call).await,
            Some(Handler::Skill) => self.run_skill(call, ctx),
            Some(Handler::Task) => self.run_task(call, ctx).await,
            None => {
                let err = ToolError::UnknownTool {
                    name: call.name.clone(),
                    available: self.names().join(", "),
                };
                warn!(tool = %call.name, "Model requested an unknown tool");
                (false, format!("Error: {err}"))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        self.events.publish(DomainEvent::ToolExecuted {
            tool_name: call.name.clone(),
            depth: ctx.depth(),
            success,
            output_chars: content.chars().count(),
            duration_ms,
            timestamp: Utc::now(),
        });

        if success {
            ToolResult::ok(&call.id, content)
        } else {
            ToolResult::error(&call.id, content)
        }
    }

    async fn run_ordinary(&self, call: &ToolCall) -> (bool, String) {
        match self.tools.execute(call).await {
            Ok(output) => (output.success, self.bound(output.output)),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                (false, self.bound(format!("Error: {e}")))
            }
        }
    }

    fn run_skill(&self, call: &ToolCall, ctx: &RunContext) -> (bool, String) {
        let Some(name) = call.arguments.get("skill").and_then(|v| v.as_str()) else {
            let err = ToolError::InvalidArguments("Missing 'skill' argument".into());
            return (false, format!("Error: {err}"));
        };

        match self.skills.load(name) {
            Ok(body) => {
                let body = self.bound(body);
                info!(skill = %name, depth = ctx.depth(), chars = body.len(), "Loaded skill");
                self.events.publish(DomainEvent::SkillLoaded {
                    skill: name.to_string(),
                    depth: ctx.depth(),
                    body_chars: body.chars().count(),
                    timestamp: Utc::now(),
                });
                (true, wrap_skill(name, &body))
            }
            Err(e) => {
                warn!(skill = %name, error = %e, "Skill load failed");
                (false, format!("Error: {e}"))
            }
        }
    }

    async fn run_task(&self, call: &ToolCall, ctx: &RunContext) -> (bool, String) {
        let Some(spawner) = &self.spawner else {
            return (false, "Error: subagents are not available here".into());
        };
        let task = match parse_task(&call.arguments) {
            Ok(task) => task,
            Err(e) => return (false, format!("Error: {e}")),
        };
        let agent_type = task.agent_type.clone();

        match spawner.spawn(task, ctx).await {
            Ok(LoopOutcome::Final { text, .. }) => (true, self.bound(text)),
            Ok(LoopOutcome::BudgetExceeded {
                limit,
                partial,
                iterations,
                ..
            }) => {
                let partial = if partial.is_empty() {
                    "(none)".to_string()
                } else {
                    partial
                };
                (
                    false,
                    self.bound(format!(
                        "[subagent error] {agent_type} stopped after {iterations} model calls: {limit} exhausted.\nPartial output:\n{partial}"
                    )),
                )
            }
            Err(e) => {
                warn!(agent_type = %agent_type, error = %e, "Subagent failed");
                (false, self.bound(format!("[subagent error] {e}")))
            }
        }
    }

    fn bound(&self, text: String) -> String {
        bound_output(text, self.settings.max_output_chars)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.names())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Truncate `text` to `max` characters, noting the overflow in the text.
pub fn bound_output(text: String, max: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max) else {
        return text;
    };
    let total = text.chars().count();
    format!(
        "{}\n\n[output truncated: showing {max} of {total} characters]",
        &text[..cut]
    )
}

fn wrap_skill(name: &str, body: &str) -> String {
    format!(
        "<skill-loaded name=\"{name}\">\n# skill: {name}\n\n{body}\n</skill-loaded>\n\nFollow the instructions in the skill above to complete the user's task."
    )
}

fn parse_task(arguments: &serde_json::Value) -> Result<SubagentTask, ToolError> {
    let field = |key: &str| -> Result<String, ToolError> {
        arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
    };
    Ok(SubagentTask {
        description: field("description")?,
        prompt: field("prompt")?,
        agent_type: field("agent_type")?,
    })
}

fn skill_definition(skills: &SkillRegistry) -> ToolDefinition {
    ToolDefinition {
        name: SKILL_TOOL.to_string(),
        description: format!(
            "Load a skill to gain specialized knowledge for a task.\n\nAvailable skills:\n{}\n\nWhen to use:\n- IMMEDIATELY when user task matches a skill description\n- Before attempting domain-specific work\n\nThe skill content will be injected into the conversation, giving you detailed instructions and access to resources.",
            skills.describe()
        ),
        parameters: json!({
            "type": "object",
            "properties": {
                "skill": {
                    "type": "string",
                    "description": "Name of the skill to load"
                }
            },
            "required": ["skill"]
        }),
    }
}

fn task_definition(agent_types: &AgentTypes) -> ToolDefinition {
    ToolDefinition {
        name: TASK_TOOL.to_string(),
        description: format!(
            "Spawn a subagent for a focused subtask. The subagent starts with a fresh conversation and returns only its final summary.\n\nAgent types:\n{}",
            agent_types.describe()
        ),
        parameters: json!({
            "type": "object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Short task name (3-5 words) for progress display"
                },
                "prompt": {
                    "type": "string",
                    "description": "Detailed instructions for the subagent"
                },
                "agent_type": {
                    "type": "string",
                    "enum": agent_types.names()
                }
            },
            "required": ["description", "prompt", "agent_type"]
        }),
    }
}
