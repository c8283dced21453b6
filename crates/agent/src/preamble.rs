//! System preamble construction.
//!
//! A preamble is built once, when a loop is created, and never touched
//! again. It may list skill and subagent metadata because both registries
//! are immutable for the life of the process; skill bodies never appear.

use std::path::Path;

use warmloop_skills::SkillRegistry;

use crate::agent_types::{AgentType, AgentTypes};

/// Preamble for a top-level run.
pub fn top_level(workdir: &Path, skills: &SkillRegistry, agent_types: &AgentTypes) -> String {
    format!(
        "You are a coding agent at {workdir}.

Loop: plan -> act with tools -> report.

**Skills available** (invoke with Skill tool when task matches):
{skills}

**Subagents available** (invoke with Task tool for focused subtasks):
{agents}

Rules:
- Use Skill tool IMMEDIATELY when a task matches a skill description
- Use Task tool for subtasks needing focused exploration or implementation
- Use TodoWrite to track multi-step work
- Prefer tools over prose. Act, don't just explain.
- After finishing, summarize what changed.",
        workdir = workdir.display(),
        skills = skills.describe(),
        agents = agent_types.describe(),
    )
}

/// Preamble for a subagent of the given type. Identical for every spawn
/// of that type, so repeated subagents share a cacheable prefix.
pub fn subagent(workdir: &Path, agent_type: &AgentType) -> String {
    format!(
        "You are a {name} subagent at {workdir}.\n\n{prompt}\n\nComplete the task and return a clear, concise summary.",
        name = agent_type.name,
        workdir = workdir.display(),
        prompt = agent_type.prompt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_types::ToolFilter;
    use warmloop_skills::KnowledgePackage;

    #[test]
    fn top_level_lists_metadata_only() {
        let mut skills = SkillRegistry::default();
        skills
            .register(KnowledgePackage::inline("pdf", "Process PDF files", "SECRET BODY"))
            .unwrap();
        let agents = AgentTypes::from_config(&warmloop_config::AppConfig::default().subagents);

        let text = top_level(Path::new("/work"), &skills, &agents);
        assert!(text.starts_with("You are a coding agent at /work."));
        assert!(text.contains("- pdf: Process PDF files"));
        assert!(text.contains("- explore: "));
        assert!(!text.contains("SECRET BODY"));
    }

    #[test]
    fn top_level_is_deterministic() {
        let skills = SkillRegistry::default();
        let agents = AgentTypes::default();
        assert_eq!(
            top_level(Path::new("/w"), &skills, &agents),
            top_level(Path::new("/w"), &skills, &agents)
        );
    }

    #[test]
    fn subagent_preamble() {
        let agent = AgentType {
            name: "explore".into(),
            description: "d".into(),
            prompt: "Search, never modify.".into(),
            tools: ToolFilter::All,
        };
        assert_eq!(
            subagent(Path::new("/w"), &agent),
            "You are a explore subagent at /w.\n\nSearch, never modify.\n\nComplete the task and return a clear, concise summary."
        );
    }
}
