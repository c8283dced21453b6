//! End-to-end integration tests for the warmloop agent.
//!
//! These tests run the full pipeline (runtime, built-in tools on a real
//! temporary workspace, skills loaded from disk, subagents) against a
//! scripted model backend, and check what the backend was sent.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::json;
use warmloop_agent::{AgentRuntime, AgentTypes, Budget, LoopLimits, LoopOutcome, RunContext};
use warmloop_config::AppConfig;
use warmloop_core::error::ProviderError;
use warmloop_core::message::{ContentBlock, Message, Role};
use warmloop_core::provider::{Provider, ProviderRequest, ProviderResponse, StopReason, Usage};
use warmloop_skills::{DEFAULT_MAX_DESCRIPTION_CHARS, SkillRegistry};
use warmloop_tools::{BuiltinToolsConfig, default_registry};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    repeat: Option<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            repeat: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn forever(response: ProviderResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::new(vec![])
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            return Ok(responses.remove(0));
        }
        self.repeat.clone().ok_or_else(|| ProviderError::ApiError {
            status_code: 500,
            message: "ScriptedProvider exhausted".into(),
        })
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        input_tokens: 10,
        output_tokens: 5,
        cache_creation_input_tokens: 0,
        cache_read_input_tokens: 0,
    })
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: usage(),
        model: "mock".into(),
    }
}

fn tool_response(calls: Vec<(&str, &str, serde_json::Value)>, thought: &str) -> ProviderResponse {
    let mut blocks = vec![ContentBlock::text(thought)];
    for (id, name, input) in calls {
        blocks.push(ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        });
    }
    ProviderResponse {
        message: Message::assistant_blocks(blocks),
        stop_reason: StopReason::ToolUse,
        usage: usage(),
        model: "mock".into(),
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const PDF_SKILL: &str = "---
name: pdf
description: Process PDF files. Use when reading, merging or splitting PDFs.
---

# PDF processing

Extract text with `pdftotext input.pdf -`.
";

fn write_pdf_skill(skills_dir: &Path) {
    let dir = skills_dir.join("pdf");
    std::fs::create_dir_all(dir.join("scripts")).unwrap();
    std::fs::write(dir.join("SKILL.md"), PDF_SKILL).unwrap();
    std::fs::write(dir.join("scripts/extract.py"), "print('x')").unwrap();
}

fn runtime(provider: Arc<ScriptedProvider>, workspace: &Path, limits: LoopLimits) -> AgentRuntime {
    let tools = default_registry(&BuiltinToolsConfig::new(workspace)).unwrap();
    let skills = SkillRegistry::from_dirs(
        &[workspace.join("skills")],
        DEFAULT_MAX_DESCRIPTION_CHARS,
    );
    AgentRuntime::new(provider, "mock", tools, Arc::new(skills))
        .with_agent_types(AgentTypes::from_config(&AppConfig::default().subagents))
        .with_limits(limits)
        .with_workdir(workspace)
}

fn tool_result(message: &Message, index: usize) -> (&str, &str, bool) {
    match &message.content[index] {
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => (tool_use_id, content, *is_error),
        other => panic!("expected a tool result, got {other:?}"),
    }
}

// ── E2E: Skills ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_skill_loaded_from_disk_on_demand() {
    let workspace = tempfile::tempdir().unwrap();
    write_pdf_skill(&workspace.path().join("skills"));

    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![("s1", "Skill", json!({"skill": "pdf"}))], "Loading pdf skill."),
        text_response("Use pdftotext."),
    ]));
    let rt = runtime(Arc::clone(&provider), workspace.path(), LoopLimits::default());
    let mut session = rt.session().unwrap();

    let outcome = session
        .send("How do I read report.pdf?", &RunContext::default())
        .await
        .unwrap();
    assert_eq!(outcome.text(), "Use pdftotext.");

    let requests = provider.requests();
    // Metadata only up front: name and description, never the body.
    assert!(requests[0].preamble.contains("- pdf: Process PDF files."));
    assert!(!requests[0].preamble.contains("pdftotext"));
    let skill_tool = requests[0].tools.iter().find(|t| t.name == "Skill").unwrap();
    assert!(skill_tool.description.contains("- pdf:"));

    // The body arrives as a single tool result with the resource listing.
    let results = session.store().get(2).unwrap();
    assert_eq!(results.role, Role::User);
    assert_eq!(results.content.len(), 1);
    let (id, content, is_error) = tool_result(results, 0);
    assert_eq!(id, "s1");
    assert!(!is_error);
    assert!(content.contains("Extract text with `pdftotext input.pdf -`."));
    assert!(content.contains("- Scripts: extract.py"));
}

// ── E2E: Built-in tools ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_write_edit_read_in_workspace() {
    let workspace = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            vec![(
                "w",
                "write_file",
                json!({"path": "notes/todo.txt", "content": "buy milk\n"}),
            )],
            "Writing.",
        ),
        tool_response(
            vec![(
                "e",
                "edit_file",
                json!({"path": "notes/todo.txt", "old_text": "milk", "new_text": "bread"}),
            )],
            "Editing.",
        ),
        tool_response(vec![("r", "read_file", json!({"path": "notes/todo.txt"}))], "Reading."),
        text_response("The note says buy bread."),
    ]));
    let rt = runtime(Arc::clone(&provider), workspace.path(), LoopLimits::default());
    let agent = rt.top_level_loop().unwrap();
    let mut store = agent.new_store();
    store.append(Message::user("Make a note"));

    let outcome = agent.run(&mut store, &RunContext::default()).await.unwrap();
    assert!(outcome.is_final());
    assert_eq!(provider.calls(), 4);

    let on_disk = std::fs::read_to_string(workspace.path().join("notes/todo.txt")).unwrap();
    assert_eq!(on_disk, "buy bread\n");
    let (_, content, is_error) = tool_result(store.get(6).unwrap(), 0);
    assert!(!is_error);
    assert!(content.contains("buy bread"));
}

#[tokio::test]
async fn e2e_workspace_escape_is_error_result_not_crash() {
    let workspace = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            vec![("r", "read_file", json!({"path": "../../etc/passwd"}))],
            "Peeking.",
        ),
        text_response("I cannot read outside the workspace."),
    ]));
    let rt = runtime(Arc::clone(&provider), workspace.path(), LoopLimits::default());
    let agent = rt.top_level_loop().unwrap();
    let mut store = agent.new_store();
    store.append(Message::user("read passwd"));

    let outcome = agent.run(&mut store, &RunContext::default()).await.unwrap();
    assert_eq!(outcome.text(), "I cannot read outside the workspace.");
    let (_, content, is_error) = tool_result(store.get(2).unwrap(), 0);
    assert!(is_error);
    assert!(content.contains("Permission denied"));
}

// ── E2E: Subagents ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_explore_subagent_runs_with_filtered_tools() {
    let workspace = tempfile::tempdir().unwrap();
    std::fs::write(workspace.path().join("a_test.rs"), "").unwrap();

    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            vec![(
                "t1",
                "Task",
                json!({
                    "description": "find test files",
                    "prompt": "List files ending in _test.rs",
                    "agent_type": "explore"
                }),
            )],
            "Delegating to explore.",
        ),
        tool_response(vec![("b1", "bash", json!({"command": "ls"}))], "Listing."),
        text_response("Found a_test.rs"),
        text_response("There is one test file: a_test.rs"),
    ]));
    let rt = runtime(Arc::clone(&provider), workspace.path(), LoopLimits::default());
    let mut session = rt.session().unwrap();

    let outcome = session
        .send("What test files exist?", &RunContext::default())
        .await
        .unwrap();
    assert_eq!(outcome.text(), "There is one test file: a_test.rs");

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);

    let sub_tools: Vec<_> = requests[1].tools.iter().map(|t| t.name.as_str()).collect();
    // At the default depth limit the subagent cannot delegate again.
    assert_eq!(sub_tools, vec!["bash", "read_file", "Skill"]);
    assert_eq!(requests[1].messages.len(), 1);
    assert!(Arc::ptr_eq(&requests[1].tools, &requests[2].tools));

    // The subagent's bash output went into its own store, not the parent's.
    let sub_result = tool_result(&requests[2].messages[2], 0);
    assert!(sub_result.1.contains("a_test.rs"));
    assert_eq!(requests[3].messages.len(), 3);
    let (id, content, is_error) = tool_result(&requests[3].messages[2], 0);
    assert_eq!((id, content, is_error), ("t1", "Found a_test.rs", false));
}

#[tokio::test]
async fn e2e_nested_spawn_stops_at_depth_limit() {
    let workspace = tempfile::tempdir().unwrap();
    let spawn = |id: &str| {
        tool_response(
            vec![(
                id,
                "Task",
                json!({"description": "deeper", "prompt": "go deeper", "agent_type": "code"}),
            )],
            "",
        )
    };
    let provider = Arc::new(ScriptedProvider::new(vec![
        spawn("outer"),
        spawn("inner"),
        spawn("deepest"),
        text_response("could not go deeper"),
        text_response("inner done"),
        text_response("done"),
    ]));
    let limits = LoopLimits {
        max_depth: 2,
        ..LoopLimits::default()
    };
    let rt = runtime(Arc::clone(&provider), workspace.path(), limits);
    let mut session = rt.session().unwrap();

    let outcome = session.send("recurse", &RunContext::default()).await.unwrap();
    assert_eq!(outcome.text(), "done");
    // parent, depth 1, depth 2, depth 2 again, depth 1 again, parent
    assert_eq!(provider.calls(), 6);

    let requests = provider.requests();
    let offers_task = |i: usize| requests[i].tools.iter().any(|t| t.name == "Task");
    assert!(offers_task(0));
    assert!(offers_task(1));
    assert!(!offers_task(2));

    let (id, content, is_error) = tool_result(&requests[3].messages[2], 0);
    assert_eq!(id, "deepest");
    assert!(is_error);
    assert!(content.contains("Unknown tool: Task"));

    let (id, content, is_error) = tool_result(&requests[4].messages[2], 0);
    assert_eq!((id, content, is_error), ("inner", "could not go deeper", false));
}

// ── E2E: Cache-preserving behaviour ──────────────────────────────────────

#[tokio::test]
async fn e2e_session_requests_extend_previous_prefix() {
    let workspace = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(
            vec![(
                "todo",
                "TodoWrite",
                json!({"items": [{"content": "Plan", "status": "in_progress", "activeForm": "Planning"}]}),
            )],
            "Tracking.",
        ),
        text_response("Planned."),
        text_response("Second turn answer."),
    ]));
    let rt = runtime(Arc::clone(&provider), workspace.path(), LoopLimits::default());
    let mut session = rt.session().unwrap();
    let ctx = RunContext::default();

    session.send("turn one", &ctx).await.unwrap();
    session.send("turn two", &ctx).await.unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    for pair in requests.windows(2) {
        assert_eq!(pair[0].preamble, pair[1].preamble);
        assert_eq!(pair[0].tools, pair[1].tools);
        let prev = &pair[0].messages;
        assert!(pair[1].messages.len() > prev.len());
        for (a, b) in prev.iter().zip(&pair[1].messages) {
            assert_eq!(a.id, b.id);
        }
    }
}

#[tokio::test]
async fn e2e_iteration_budget_reports_partial() {
    let workspace = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::forever(tool_response(
        vec![("b", "bash", json!({"command": "echo working"}))],
        "Still going",
    )));
    let limits = LoopLimits {
        budget: Budget::iterations(3),
        ..LoopLimits::default()
    };
    let rt = runtime(Arc::clone(&provider), workspace.path(), limits);
    let mut session = rt.session().unwrap();

    let outcome = session.send("never stop", &RunContext::default()).await.unwrap();
    assert!(matches!(outcome, LoopOutcome::BudgetExceeded { iterations: 3, .. }));
    assert_eq!(outcome.text(), "Still going");
    assert_eq!(provider.calls(), 3);
}
