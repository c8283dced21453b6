//! The cache-preserving agent loop: the heart of warmloop.
//!
//! The loop follows a **call → dispatch → append** cycle:
//!
//! 1. **Send** the fixed preamble, the fixed tool catalog and the whole
//!    conversation to the model
//! 2. **If tool calls**: run them through the [`Dispatcher`], append the
//!    assistant message and one message of results, loop back to step 1
//! 3. **If text only**: append it and return it as the answer
//!
//! Knowledge arrives through the `Skill` tool as ordinary tool results and
//! subagents run in stores of their own through the `Task` tool, so the
//! only thing that ever changes between two requests is the tail.

pub mod agent_types;
pub mod dispatcher;
pub mod loop_runner;
pub mod outcome;
pub mod preamble;
pub mod run_context;
pub mod runtime;
pub mod session;
pub mod subagent;

#[cfg(test)]
mod test_helpers;

pub use agent_types::{AgentType, AgentTypes, ToolFilter};
pub use dispatcher::{DispatchSettings, Dispatcher, SKILL_TOOL, TASK_TOOL};
pub use loop_runner::AgentLoop;
pub use outcome::{Budget, BudgetLimit, LoopOutcome};
pub use run_context::RunContext;
pub use runtime::{AgentRuntime, LoopLimits};
pub use session::Session;
pub use subagent::{SubagentSpawner, SubagentTask};
