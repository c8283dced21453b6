pub mod agent;
pub mod doctor;
pub mod onboard;
pub mod skills;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use warmloop_agent::AgentRuntime;
use warmloop_config::AppConfig;
use warmloop_skills::SkillRegistry;
use warmloop_tools::BuiltinToolsConfig;

/// Scan the configured skill directories (metadata only).
pub fn load_skills(config: &AppConfig, workdir: &Path) -> SkillRegistry {
    SkillRegistry::from_dirs(
        &config.skill_dirs(workdir),
        config.skills.max_description_chars,
    )
}

pub fn tools_config(config: &AppConfig, workdir: &Path) -> BuiltinToolsConfig {
    BuiltinToolsConfig {
        workdir: workdir.to_path_buf(),
        workspace_only: config.autonomy.workspace_only,
        allowed_commands: config.autonomy.allowed_commands.clone(),
        denied_patterns: config.autonomy.denied_patterns.clone(),
        timeout: Duration::from_secs(config.agent.tool_timeout_secs),
    }
}

/// Wire provider, tools and skills into a runtime.
pub fn build_runtime(config: &AppConfig) -> Result<AgentRuntime, Box<dyn std::error::Error>> {
    config.validate()?;
    let workdir = config.workdir();
    let provider = warmloop_providers::build_from_config(config)?;
    let model = warmloop_providers::resolve_model(config);
    let tools = warmloop_tools::default_registry(&tools_config(config, &workdir))?;
    let skills = Arc::new(load_skills(config, &workdir));

    tracing::debug!(
        workdir = %workdir.display(),
        tools = tools.len(),
        skills = skills.len(),
        "Runtime assembled"
    );
    Ok(AgentRuntime::from_config(config, provider, model, tools, skills))
}
