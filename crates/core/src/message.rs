//! Message domain types.
//!
//! A message is an ordered list of content blocks. Assistant messages mix
//! text with tool invocations; the user-role message that follows carries
//! exactly one tool-result block per invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session or subagent run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
///
/// Tool results are not a separate role: they travel as `User` messages
/// made of [`ContentBlock::ToolResult`] blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user, or tool results flowing back to the model
    User,
    /// The model
    Assistant,
}

/// One block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },

    /// A tool invocation emitted by the model.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The answer to one tool invocation.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// Ordered content blocks
    pub content: Vec<ContentBlock>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_blocks(role: Role, content: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message holding a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_blocks(Role::User, vec![ContentBlock::text(text)])
    }

    /// Create a new assistant message holding a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_blocks(Role::Assistant, vec![ContentBlock::text(text)])
    }

    /// Create an assistant message from arbitrary blocks.
    pub fn assistant_blocks(content: Vec<ContentBlock>) -> Self {
        Self::with_blocks(Role::Assistant, content)
    }

    /// Create the user-role message that answers one model response.
    pub fn tool_results(results: Vec<crate::tool::ToolResult>) -> Self {
        let content = results
            .into_iter()
            .map(|r| ContentBlock::ToolResult {
                tool_use_id: r.call_id,
                content: r.content,
                is_error: r.is_error,
            })
            .collect();
        Self::with_blocks(Role::User, content)
    }

    /// Concatenation of all text blocks, separated by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool invocations carried by this message, in emission order.
    pub fn tool_calls(&self) -> Vec<crate::tool::ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(crate::tool::ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Whether any block is a tool invocation.
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.content
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => text.len(),
                ContentBlock::ToolUse { name, input, .. } => name.len() + input.to_string().len(),
                ContentBlock::ToolResult { content, .. } => content.len(),
            })
            .sum::<usize>()
            / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolResult;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn text_skips_tool_blocks() {
        let msg = Message::assistant_blocks(vec![
            ContentBlock::text("Looking"),
            ContentBlock::ToolUse {
                id: "t1".into(),
                name: "bash".into(),
                input: serde_json::json!({"command": "ls"}),
            },
            ContentBlock::text("around"),
        ]);
        assert_eq!(msg.text(), "Looking\naround");
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "bash");
        assert_eq!(calls[0].arguments["command"], "ls");
    }

    #[test]
    fn tool_results_become_user_blocks() {
        let msg = Message::tool_results(vec![
            ToolResult::ok("a", "first"),
            ToolResult::error("b", "boom"),
        ]);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content.len(), 2);
        match &msg.content[1] {
            ContentBlock::ToolResult { tool_use_id, is_error, .. } => {
                assert_eq!(tool_use_id, "b");
                assert!(is_error);
            }
            other => panic!("Expected tool_result block, got {other:?}"),
        }
    }

    #[test]
    fn content_block_tagging() {
        let json = serde_json::to_string(&ContentBlock::text("hi")).unwrap();
        assert!(json.contains(r#""type":"text""#));

        let ok = ContentBlock::ToolResult {
            tool_use_id: "x".into(),
            content: "done".into(),
            is_error: false,
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains(r#""type":"tool_result""#));
        assert!(!json.contains("is_error"));
    }

    #[test]
    fn token_estimate() {
        // 20 chars ≈ 5 tokens
        let msg = Message::user("12345678901234567890");
        assert_eq!(msg.estimated_tokens(), 5);
    }
}
