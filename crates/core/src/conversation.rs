//! The append-only conversation store.
//!
//! The backend's prefix cache only pays off when every request starts with
//! exactly the bytes of the previous one. The store therefore owns a
//! preamble fixed at construction and a message list that can only grow.
//! Stored messages are handed out as `Arc<Message>` so callers can read
//! them cheaply but never get mutable access.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::InvariantViolation;
use crate::message::{ConversationId, Message};

/// Ordered, append-only message history plus its immutable system preamble.
#[derive(Debug)]
pub struct ConversationStore {
    id: ConversationId,
    preamble: Arc<str>,
    messages: Vec<Arc<Message>>,
    created_at: DateTime<Utc>,
}

impl ConversationStore {
    /// Create an empty store bound to `preamble` for its whole lifetime.
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            preamble: Arc::from(preamble.into()),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a store and seed it with initial messages.
    pub fn with_messages(preamble: impl Into<String>, messages: Vec<Message>) -> Self {
        let mut store = Self::new(preamble);
        for message in messages {
            store.append(message);
        }
        store
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The system preamble, identical for every call made against this store.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Shared handle to the preamble; clones point at the same bytes.
    pub fn preamble_arc(&self) -> Arc<str> {
        Arc::clone(&self.preamble)
    }

    /// Append a message and return its position. The only mutator.
    pub fn append(&mut self, message: Message) -> usize {
        let position = self.messages.len();
        self.messages.push(Arc::new(message));
        position
    }

    /// The full ordered sequence for the next model call.
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        self.messages.clone()
    }

    /// Message at `position`, if any.
    pub fn get(&self, position: usize) -> Option<&Message> {
        self.messages.get(position).map(|m| m.as_ref())
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last().map(|m| m.as_ref())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.messages.iter().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Rejects any rewrite of an existing entry.
    ///
    /// Exists so callers holding a position get an explicit contract error
    /// instead of reaching for interior mutability.
    pub fn edit(
        &mut self,
        position: usize,
        _replacement: Message,
    ) -> Result<(), InvariantViolation> {
        Err(InvariantViolation::MutationAttempt {
            operation: "edit",
            position,
        })
    }

    /// Rejects any removal of an existing entry.
    pub fn remove(&mut self, position: usize) -> Result<Message, InvariantViolation> {
        Err(InvariantViolation::MutationAttempt {
            operation: "remove",
            position,
        })
    }

    /// Rough token estimate for preamble plus history (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.preamble.len() / 4 + self.messages.iter().map(|m| m.estimated_tokens()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_positions() {
        let mut store = ConversationStore::new("You are helpful.");
        assert_eq!(store.append(Message::user("one")), 0);
        assert_eq!(store.append(Message::assistant("two")), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().text(), "two");
    }

    #[test]
    fn snapshot_is_prefix_of_later_snapshot() {
        let mut store = ConversationStore::new("p");
        store.append(Message::user("first"));
        let before = store.snapshot();
        store.append(Message::assistant("second"));
        let after = store.snapshot();

        assert!(after.len() > before.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn edit_and_remove_are_rejected() {
        let mut store = ConversationStore::new("p");
        store.append(Message::user("keep me"));

        let err = store.edit(0, Message::user("rewritten")).unwrap_err();
        assert_eq!(
            err,
            InvariantViolation::MutationAttempt { operation: "edit", position: 0 }
        );
        assert!(store.remove(0).is_err());
        assert_eq!(store.get(0).unwrap().text(), "keep me");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn preamble_is_shared_not_copied() {
        let store = ConversationStore::new("fixed preamble");
        let a = store.preamble_arc();
        let b = store.preamble_arc();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.preamble(), "fixed preamble");
    }

    #[test]
    fn stores_never_share_messages() {
        let mut parent = ConversationStore::new("parent");
        parent.append(Message::user("task"));
        let mut child = ConversationStore::new("child");
        child.append(Message::user("task"));

        let p = parent.snapshot();
        let c = child.snapshot();
        assert!(!Arc::ptr_eq(&p[0], &c[0]));
        assert_ne!(parent.id(), child.id());
    }
}
