//! # warmloop Core
//!
//! Domain types, traits, and error definitions for the warmloop agent loop.
//! Every other crate depends inward on this one.
//!
//! ## Cache contract
//!
//! The model backend reuses computation for any request whose leading bytes
//! match a previous request exactly. Three things keep that true:
//! - [`ConversationStore`] only grows and keeps its preamble for life
//! - [`ToolRegistry`] yields a catalog in a stable order
//! - [`PrefixGuard`] rejects any request that would break the prefix

pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod prefix;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use conversation::ConversationStore;
pub use error::{Error, InvariantViolation, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{ContentBlock, ConversationId, Message, Role};
pub use prefix::{PrefixGuard, PrefixReport};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StopReason, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolOutput, ToolRegistry, ToolResult};
