//! Shared test helpers: scripted providers and small tools.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;
use warmloop_core::error::{ProviderError, ToolError};
use warmloop_core::message::{ContentBlock, Message};
use warmloop_core::provider::{Provider, ProviderRequest, ProviderResponse, StopReason, Usage};
use warmloop_core::tool::{Tool, ToolCall, ToolOutput};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Once the queue is empty it answers with the
/// fallback if one was set, otherwise with an API error.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    fallback: Option<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that answers every call with `response`.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return Ok(responses.remove(0));
        }
        self.fallback.clone().ok_or_else(|| ProviderError::ApiError {
            status_code: 500,
            message: format!("SequentialMockProvider: no response scripted for call #{call}"),
        })
    }
}

/// A provider whose calls never complete.
pub struct PendingProvider;

#[async_trait::async_trait]
impl Provider for PendingProvider {
    fn name(&self) -> &str {
        "pending"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

fn mock_usage() -> Usage {
    Usage {
        input_tokens: 10,
        output_tokens: 5,
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: 0,
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: Some(mock_usage()),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought text.
pub fn make_tool_call_response(tool_calls: Vec<ToolCall>, thought: &str) -> ProviderResponse {
    let mut blocks = Vec::new();
    if !thought.is_empty() {
        blocks.push(ContentBlock::text(thought));
    }
    blocks.extend(tool_calls.into_iter().map(|c| ContentBlock::ToolUse {
        id: c.id,
        name: c.name,
        input: c.arguments,
    }));
    ProviderResponse {
        message: Message::assistant_blocks(blocks),
        stop_reason: StopReason::ToolUse,
        usage: Some(mock_usage()),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: args,
    }
}

/// Returns its `text` argument.
pub struct EchoTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the given text"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
        Ok(ToolOutput::ok(text))
    }
}

/// Sleeps for `ms` milliseconds, then returns `tag`.
pub struct DelayTool;

#[async_trait::async_trait]
impl Tool for DelayTool {
    fn name(&self) -> &str {
        "delay"
    }

    fn description(&self) -> &str {
        "Wait, then answer"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ms": { "type": "integer" },
                "tag": { "type": "string" }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let ms = arguments["ms"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(ToolOutput::ok(arguments["tag"].as_str().unwrap_or("")))
    }
}
