//! Domain event system: progress reporting without touching the store.
//!
//! The loop, dispatcher and spawner publish events here; front ends
//! subscribe to render progress. Events never feed back into a
//! conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A model call completed
    ModelCalled {
        conversation_id: String,
        depth: u32,
        iteration: u32,
        model: String,
        reused_messages: usize,
        cache_read_tokens: u32,
        cache_write_tokens: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool handler finished
    ToolExecuted {
        tool_name: String,
        depth: u32,
        success: bool,
        output_chars: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A knowledge package body was injected into a conversation
    SkillLoaded {
        skill: String,
        depth: u32,
        body_chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A subagent run started
    SubagentStarted {
        agent_type: String,
        description: String,
        depth: u32,
        timestamp: DateTime<Utc>,
    },

    /// A subagent run ended (successfully or not)
    SubagentFinished {
        agent_type: String,
        description: String,
        depth: u32,
        success: bool,
        iterations: u32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A loop stopped because its budget ran out
    BudgetExceeded {
        conversation_id: String,
        depth: u32,
        iterations: u32,
        tokens_used: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::SkillLoaded {
            skill: "pdf".into(),
            depth: 0,
            body_chars: 42,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::SkillLoaded { skill, body_chars, .. } => {
                assert_eq!(skill, "pdf");
                assert_eq!(*body_chars, 42);
            }
            _ => panic!("Expected SkillLoaded event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::BudgetExceeded {
            conversation_id: "c".into(),
            depth: 1,
            iterations: 3,
            tokens_used: 0,
            timestamp: Utc::now(),
        });
    }
}
