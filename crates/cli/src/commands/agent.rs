//! `warmloop agent`: interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use warmloop_agent::{LoopOutcome, RunContext, Session};
use warmloop_config::AppConfig;
use warmloop_core::event::{DomainEvent, EventBus};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early, with a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export ANTHROPIC_API_KEY='sk-ant-...'");
        eprintln!("    export WARMLOOP_API_KEY='sk-ant-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let runtime = super::build_runtime(&config)?;
    let progress = spawn_progress(runtime.events());
    let mut session = runtime.session()?;

    if let Some(msg) = message {
        // Single message mode
        let outcome = run_turn(&mut session, msg).await?;
        println!("{}", render_outcome(&outcome));
    } else {
        println!();
        println!("  warmloop: interactive mode");
        println!();
        println!("  Model:     {}", runtime.model());
        println!("  Workdir:   {}", runtime.workdir().display());
        println!("  Skills:    {}", runtime.skills().names().join(", "));
        println!("  Subagents: {}", runtime.agent_types().names().join(", "));
        println!();
        println!("  Ctrl+C cancels the running turn. Type 'exit' to quit.");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("  You > ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "exit" | "quit" | "q") {
                break;
            }

            match run_turn(&mut session, line.to_string()).await {
                Ok(outcome) => {
                    println!();
                    for text in render_outcome(&outcome).lines() {
                        println!("  Assistant > {text}");
                    }
                    println!();
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            }
        }

        println!();
        println!("  Goodbye!");
        println!();
    }

    progress.abort();
    Ok(())
}

/// Run one turn; Ctrl-C cancels it without ending the session.
async fn run_turn(
    session: &mut Session,
    text: String,
) -> Result<LoopOutcome, warmloop_core::Error> {
    let token = CancellationToken::new();
    let ctx = RunContext::new(token.clone());
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let result = session.send(text, &ctx).await;
    watcher.abort();
    result
}

fn render_outcome(outcome: &LoopOutcome) -> String {
    match outcome {
        LoopOutcome::Final { text, .. } => text.clone(),
        LoopOutcome::BudgetExceeded {
            limit,
            partial,
            iterations,
            ..
        } => {
            let mut out = format!("[stopped: {limit} exhausted after {iterations} model calls]");
            if !partial.is_empty() {
                out.push('\n');
                out.push_str(partial);
            }
            out
        }
    }
}

/// Print tool and subagent activity to stderr while a turn runs.
fn spawn_progress(events: &Arc<EventBus>) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = describe(&event) {
                        eprintln!("{line}");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn describe(event: &DomainEvent) -> Option<String> {
    let indent = |depth: u32| "  ".repeat(depth as usize + 1);
    match event {
        DomainEvent::ToolExecuted {
            tool_name,
            depth,
            success,
            duration_ms,
            ..
        } => {
            let mark = if *success { ">" } else { "!" };
            Some(format!("{}{mark} {tool_name} ({duration_ms} ms)", indent(*depth)))
        }
        DomainEvent::SkillLoaded { skill, depth, .. } => {
            Some(format!("{}[skill] {skill} loaded", indent(*depth)))
        }
        DomainEvent::SubagentStarted {
            agent_type,
            description,
            depth,
            ..
        } => Some(format!("{}[{agent_type}] {description}", indent(*depth))),
        DomainEvent::SubagentFinished {
            agent_type,
            depth,
            success,
            iterations,
            duration_ms,
            ..
        } => {
            let status = if *success { "done" } else { "failed" };
            Some(format!(
                "{}[{agent_type}] {status} after {iterations} calls ({:.1}s)",
                indent(*depth),
                *duration_ms as f64 / 1000.0
            ))
        }
        DomainEvent::BudgetExceeded {
            depth, iterations, ..
        } => Some(format!(
            "{}! budget exhausted after {iterations} calls",
            indent(*depth)
        )),
        DomainEvent::ModelCalled { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use warmloop_agent::BudgetLimit;
    use warmloop_core::provider::Usage;

    #[test]
    fn render_final_and_partial() {
        let done = LoopOutcome::Final {
            text: "All good".into(),
            iterations: 2,
            usage: Usage::default(),
        };
        assert_eq!(render_outcome(&done), "All good");

        let cut = LoopOutcome::BudgetExceeded {
            limit: BudgetLimit::Iterations,
            partial: "half done".into(),
            iterations: 3,
            usage: Usage::default(),
        };
        assert_eq!(
            render_outcome(&cut),
            "[stopped: iteration budget exhausted after 3 model calls]\nhalf done"
        );
    }

    #[test]
    fn progress_lines_indent_by_depth() {
        let top = DomainEvent::ToolExecuted {
            tool_name: "bash".into(),
            depth: 0,
            success: true,
            output_chars: 10,
            duration_ms: 12,
            timestamp: Utc::now(),
        };
        assert_eq!(describe(&top).unwrap(), "  > bash (12 ms)");

        let nested = DomainEvent::SubagentStarted {
            agent_type: "explore".into(),
            description: "find tests".into(),
            depth: 1,
            timestamp: Utc::now(),
        };
        assert_eq!(describe(&nested).unwrap(), "    [explore] find tests");

        let call = DomainEvent::ModelCalled {
            conversation_id: "c".into(),
            depth: 0,
            iteration: 1,
            model: "m".into(),
            reused_messages: 0,
            cache_read_tokens: 0,
            cache_write_tokens: 0,
            timestamp: Utc::now(),
        };
        assert!(describe(&call).is_none());
    }
}
