//! Subagent spawning.
//!
//! A subagent is a fresh [`AgentLoop`](crate::AgentLoop) with its own empty
//! store, seeded with a single user message. Nothing from the parent
//! conversation is copied in and only the final text comes back out, so the
//! parent's prefix grows by one tool result regardless of how much work
//! the subagent did.

use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{info, warn};
use warmloop_core::error::{Error, SpawnError};
use warmloop_core::event::DomainEvent;
use warmloop_core::message::Message;

use crate::agent_types::AgentTypes;
use crate::outcome::LoopOutcome;
use crate::run_context::RunContext;
use crate::runtime::AgentRuntime;

/// What the model asked a subagent to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubagentTask {
    /// Short label for progress display
    pub description: String,
    /// The full instructions, sent as the subagent's only user message
    pub prompt: String,
    pub agent_type: String,
}

#[derive(Clone)]
pub struct SubagentSpawner {
    runtime: AgentRuntime,
}

impl SubagentSpawner {
    pub(crate) fn new(runtime: AgentRuntime) -> Self {
        Self { runtime }
    }

    pub fn agent_types(&self) -> &AgentTypes {
        self.runtime.agent_types()
    }

    pub fn max_depth(&self) -> u32 {
        self.runtime.limits().max_depth
    }

    /// Run `task` in an isolated loop one level below `ctx`.
    ///
    /// The depth check happens before anything is built: at the limit no
    /// store exists and no model call is made. The subagent inherits
    /// cancellation from `ctx`.
    ///
    /// Boxed because a subagent's own dispatcher may call back in here.
    pub fn spawn<'a>(
        &'a self,
        task: SubagentTask,
        ctx: &'a RunContext,
    ) -> BoxFuture<'a, Result<LoopOutcome, Error>> {
        async move {
            let max_depth = self.max_depth();
            if ctx.depth() >= max_depth {
                warn!(
                    depth = ctx.depth(),
                    max_depth,
                    agent_type = %task.agent_type,
                    "Refusing to spawn subagent past the depth limit"
                );
                return Err(SpawnError::RecursionLimitExceeded {
                    depth: ctx.depth(),
                    max_depth,
                }
                .into());
            }

            let agent_type = self.agent_types().get(&task.agent_type).ok_or_else(|| {
                SpawnError::UnknownAgentType {
                    name: task.agent_type.clone(),
                    available: self.agent_types().names().join(", "),
                }
            })?;

            let child = ctx.child();
            let agent = self.runtime.subagent_loop(agent_type, child.depth())?;
            let mut store = agent.new_store();
            store.append(Message::user(task.prompt.clone()));

            info!(
                agent_type = %task.agent_type,
                description = %task.description,
                depth = child.depth(),
                "Subagent started"
            );
            let events = self.runtime.events();
            events.publish(DomainEvent::SubagentStarted {
                agent_type: task.agent_type.clone(),
                description: task.description.clone(),
                depth: child.depth(),
                timestamp: Utc::now(),
            });

            let start = Instant::now();
            let result = agent.run(&mut store, &child).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, iterations) = match &result {
                Ok(outcome) => (outcome.is_final(), outcome.iterations()),
                Err(_) => (false, 0),
            };
            info!(
                agent_type = %task.agent_type,
                success,
                iterations,
                duration_ms,
                "Subagent finished"
            );
            events.publish(DomainEvent::SubagentFinished {
                agent_type: task.agent_type,
                description: task.description,
                depth: child.depth(),
                success,
                iterations,
                duration_ms,
                timestamp: Utc::now(),
            });

            result
        }
        .boxed()
    }
}

impl std::fmt::Debug for SubagentSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubagentSpawner")
            .field("agent_types", &self.agent_types().names())
            .field("max_depth", &self.max_depth())
            .finish()
    }
}
