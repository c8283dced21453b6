//! Multi-turn conversations over one store.

use warmloop_core::conversation::ConversationStore;
use warmloop_core::error::Error;
use warmloop_core::message::Message;
use warmloop_core::prefix::PrefixGuard;

use crate::loop_runner::AgentLoop;
use crate::outcome::LoopOutcome;
use crate::run_context::RunContext;

/// A top-level loop plus the store it keeps extending, turn after turn.
///
/// The prefix guard lives as long as the session, so turn *n+1* must
/// begin with every byte sent in turn *n*.
#[derive(Debug)]
pub struct Session {
    agent: AgentLoop,
    store: ConversationStore,
    guard: PrefixGuard,
}

impl Session {
    pub fn new(agent: AgentLoop) -> Self {
        let store = agent.new_store();
        Self {
            agent,
            store,
            guard: PrefixGuard::new(),
        }
    }

    /// Append a user message and run the loop until it yields an outcome.
    ///
    /// If the run is cancelled or fails, the user message stays in the
    /// store; the next turn follows it.
    pub async fn send(
        &mut self,
        text: impl Into<String>,
        ctx: &RunContext,
    ) -> Result<LoopOutcome, Error> {
        self.store.append(Message::user(text));
        self.agent
            .run_guarded(&mut self.store, &mut self.guard, ctx)
            .await
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn agent(&self) -> &AgentLoop {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{DispatchSettings, Dispatcher};
    use crate::test_helpers::{SequentialMockProvider, make_text_response};
    use std::sync::Arc;
    use warmloop_core::event::EventBus;
    use warmloop_core::message::Role;
    use warmloop_core::tool::ToolRegistry;
    use warmloop_skills::SkillRegistry;

    fn session(provider: Arc<SequentialMockProvider>) -> Session {
        let dispatcher = Dispatcher::new(
            ToolRegistry::new(),
            Arc::new(SkillRegistry::default()),
            None,
            DispatchSettings::default(),
            Arc::new(EventBus::default()),
        )
        .unwrap();
        Session::new(AgentLoop::new(provider, "mock-model", "Session preamble", dispatcher))
    }

    #[tokio::test]
    async fn turns_extend_one_store() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("first answer"),
            make_text_response("second answer"),
        ]));
        let mut session = session(Arc::clone(&provider));
        let ctx = RunContext::default();

        assert_eq!(session.send("one", &ctx).await.unwrap().text(), "first answer");
        assert_eq!(session.send("two", &ctx).await.unwrap().text(), "second answer");

        let roles: Vec<_> = session.store().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );

        let requests = provider.requests();
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[1].messages.len(), 3);
        assert!(Arc::ptr_eq(&requests[0].messages[0], &requests[1].messages[0]));
        assert_eq!(requests[0].preamble.as_ref(), "Session preamble");
        assert_eq!(requests[0].preamble, requests[1].preamble);
    }

    #[tokio::test]
    async fn failed_turn_keeps_user_message() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let mut session = session(provider);
        assert!(session.send("hello", &RunContext::default()).await.is_err());
        assert_eq!(session.store().len(), 1);
    }
}
