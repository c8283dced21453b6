//! The cache-preserving agent loop.
//!
//! Each iteration sends the same preamble, the same tool catalog and the
//! whole message history, then either returns the model's answer or
//! dispatches the requested tools and appends their results. Nothing that
//! was already sent is ever edited, so every request is a byte-for-byte
//! extension of the previous one and the backend's prefix cache keeps
//! hitting.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use warmloop_core::conversation::ConversationStore;
use warmloop_core::error::{Error, InvariantViolation};
use warmloop_core::event::{DomainEvent, EventBus};
use warmloop_core::message::{Message, Role};
use warmloop_core::prefix::PrefixGuard;
use warmloop_core::provider::{Provider, ProviderRequest, StopReason, ToolDefinition, Usage};

use crate::dispatcher::Dispatcher;
use crate::outcome::{Budget, LoopOutcome};
use crate::run_context::RunContext;

/// Returned as the answer when the model ends its turn without any text.
pub const EMPTY_RESPONSE: &str = "(model returned no text)";

/// The core agent loop that alternates model calls and tool dispatch.
pub struct AgentLoop {
    /// The model backend
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// System preamble, fixed for the life of the loop
    preamble: Arc<str>,

    /// Closed handler table and frozen catalog
    dispatcher: Dispatcher,

    /// Per-run ceiling
    budget: Budget,

    /// Event bus for domain events
    events: Arc<EventBus>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        preamble: impl Into<String>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            preamble: Arc::from(preamble.into()),
            dispatcher,
            budget: Budget::default(),
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn catalog(&self) -> Arc<[ToolDefinition]> {
        self.dispatcher.catalog()
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// An empty store bound to this loop's preamble.
    pub fn new_store(&self) -> ConversationStore {
        ConversationStore::new(self.preamble.to_string())
    }

    /// Drive `store` until the model answers without tools, the budget runs
    /// out, or `ctx` is cancelled.
    ///
    /// Errors are fatal to this run: a provider failure, cancellation, or a
    /// breach of the append-only prefix. A step interrupted by any of them
    /// leaves the store exactly as it was before that step.
    pub async fn run(
        &self,
        store: &mut ConversationStore,
        ctx: &RunContext,
    ) -> Result<LoopOutcome, Error> {
        let mut guard = PrefixGuard::new();
        self.run_guarded(store, &mut guard, ctx).await
    }

    /// [`run`](Self::run) with a guard that outlives the call, so the
    /// prefix is also checked across the turns of a session.
    pub(crate) async fn run_guarded(
        &self,
        store: &mut ConversationStore,
        guard: &mut PrefixGuard,
        ctx: &RunContext,
    ) -> Result<LoopOutcome, Error> {
        if store.preamble() != &*self.preamble {
            return Err(InvariantViolation::PreambleChanged.into());
        }

        info!(
            conversation_id = %store.id(),
            depth = ctx.depth(),
            messages = store.len(),
            "Starting agent run"
        );

        let mut iterations: u32 = 0;
        let mut usage = Usage::default();

        loop {
            if let Some(limit) = self.budget.exhausted(iterations, usage.total_tokens()) {
                let partial = store
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Assistant)
                    .map(|m| m.text())
                    .unwrap_or_default();
                warn!(
                    conversation_id = %store.id(),
                    depth = ctx.depth(),
                    iterations,
                    tokens_used = usage.total_tokens(),
                    %limit,
                    "Budget exhausted, stopping run"
                );
                self.events.publish(DomainEvent::BudgetExceeded {
                    conversation_id: store.id().to_string(),
                    depth: ctx.depth(),
                    iterations,
                    tokens_used: usage.total_tokens(),
                    timestamp: Utc::now(),
                });
                return Ok(LoopOutcome::BudgetExceeded {
                    limit,
                    partial,
                    iterations,
                    usage,
                });
            }

            if ctx.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let request = ProviderRequest {
                model: self.model.clone(),
                preamble: store.preamble_arc(),
                messages: store.snapshot(),
                tools: self.dispatcher.catalog(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            };
            let prefix = guard.check(&request)?;

            let response = tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => return Err(Error::Cancelled),
                response = self.provider.complete(request) => response?,
            };
            iterations += 1;

            let call_usage = response.usage.unwrap_or_default();
            usage.accumulate(&call_usage);
            debug!(
                conversation_id = %store.id(),
                depth = ctx.depth(),
                iteration = iterations,
                stop_reason = ?response.stop_reason,
                prefix_messages = prefix.reused_messages,
                cache_read_tokens = call_usage.cache_read_input_tokens,
                cache_write_tokens = call_usage.cache_creation_input_tokens,
                "Model call completed"
            );
            self.events.publish(DomainEvent::ModelCalled {
                conversation_id: store.id().to_string(),
                depth: ctx.depth(),
                iteration: iterations,
                model: response.model.clone(),
                reused_messages: prefix.reused_messages,
                cache_read_tokens: call_usage.cache_read_input_tokens,
                cache_write_tokens: call_usage.cache_creation_input_tokens,
                timestamp: Utc::now(),
            });

            let calls = response.message.tool_calls();
            if calls.is_empty() {
                if response.stop_reason == StopReason::MaxTokens {
                    warn!(conversation_id = %store.id(), "Response cut off at max_tokens");
                }
                let text = response.message.text();
                store.append(response.message);
                let text = if text.trim().is_empty() {
                    EMPTY_RESPONSE.to_string()
                } else {
                    text
                };
                info!(
                    conversation_id = %store.id(),
                    depth = ctx.depth(),
                    iterations,
                    tokens_used = usage.total_tokens(),
                    "Run finished"
                );
                return Ok(LoopOutcome::Final {
                    text,
                    iterations,
                    usage,
                });
            }

            debug!(tool_count = calls.len(), "Executing tool calls");
            let results = tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => return Err(Error::Cancelled),
                results = self.dispatcher.dispatch_all(&calls, ctx) => results,
            };

            // The invocation and its results land together or not at all.
            store.append(response.message);
            store.append(Message::tool_results(results));
        }
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("dispatcher", &self.dispatcher)
            .field("budget", &self.budget)
            .finish()
    }
}
