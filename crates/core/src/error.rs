//! Error types for the warmloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Two families live here. Recoverable errors (`ToolError`, `SkillError`,
//! `SpawnError`) never escape the dispatcher: they are rendered as tool
//! result text so the model can react. Fatal errors (`InvariantViolation`,
//! provider failures, cancellation) abort the run that raised them.

use thiserror::Error;

/// The top-level error type for all warmloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Skill errors ---
    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    // --- Subagent errors ---
    #[error("Subagent error: {0}")]
    Spawn(#[from] SpawnError),

    // --- Cache contract ---
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    // --- Cancellation ---
    #[error("Run cancelled")]
    Cancelled,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error must end the whole run.
    ///
    /// Everything except tool, skill and spawn errors is fatal; those three
    /// are normally absorbed by the dispatcher before they get here.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Tool(_) | Error::Skill(_) | Error::Spawn(_))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {name}. Available: {available}")]
    UnknownTool { name: String, available: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
}

#[derive(Debug, Clone, Error)]
pub enum SkillError {
    #[error("Unknown skill '{name}'. Available: {available}")]
    NotFound { name: String, available: String },

    #[error("Skill '{0}' is already registered")]
    DuplicateName(String),

    #[error("Skill '{name}' description is {len} chars, limit is {max}")]
    DescriptionTooLong { name: String, len: usize, max: usize },

    #[error("Invalid skill package at {path}: {reason}")]
    InvalidPackage { path: String, reason: String },

    #[error("Failed to read skill '{name}': {reason}")]
    Io { name: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum SpawnError {
    #[error("Recursion limit exceeded: depth {depth} reached the maximum of {max_depth}")]
    RecursionLimitExceeded { depth: u32, max_depth: u32 },

    #[error("Unknown agent type '{name}'. Available: {available}")]
    UnknownAgentType { name: String, available: String },

    #[error("Subagent failed: {0}")]
    Failed(String),
}

/// A breach of the append-only / stable-prefix contract.
///
/// Always fatal: continuing would silently void every cached prefix
/// the backend holds for this run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error(
        "attempted to {operation} message at position {position}; the conversation is append-only"
    )]
    MutationAttempt {
        operation: &'static str,
        position: usize,
    },

    #[error("system preamble changed mid-run")]
    PreambleChanged,

    #[error("tool catalog changed mid-run")]
    CatalogChanged,

    #[error("message prefix diverged at position {position}")]
    PrefixDiverged { position: usize },
}
