//! Everything needed to build loops: shared, immutable, cheap to clone.
//!
//! An [`AgentRuntime`] owns no conversation state. It builds a top-level
//! [`AgentLoop`] for the user and, through the subagent spawner, one fresh
//! loop per `Task` invocation. Registries are shared by `Arc` and never
//! change after construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use warmloop_config::{AgentSettings, AppConfig};
use warmloop_core::error::Error;
use warmloop_core::event::EventBus;
use warmloop_core::provider::Provider;
use warmloop_core::tool::ToolRegistry;
use warmloop_skills::SkillRegistry;

use crate::agent_types::{AgentType, AgentTypes, ToolFilter};
use crate::dispatcher::{DispatchSettings, Dispatcher};
use crate::loop_runner::AgentLoop;
use crate::outcome::Budget;
use crate::preamble;
use crate::session::Session;
use crate::subagent::SubagentSpawner;

/// Limits applied to the loops a runtime builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    pub budget: Budget,
    pub subagent_budget: Budget,
    /// Subagent nesting limit; 0 disables `Task`
    pub max_depth: u32,
    pub max_output_chars: usize,
    pub parallel_tool_calls: bool,
}

impl LoopLimits {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            budget: Budget::iterations(settings.max_iterations)
                .with_max_tokens(settings.max_tokens_budget),
            subagent_budget: Budget::iterations(settings.subagent_max_iterations)
                .with_max_tokens(settings.subagent_max_tokens),
            max_depth: settings.max_depth,
            max_output_chars: settings.max_output_chars,
            parallel_tool_calls: settings.parallel_tool_calls,
        }
    }

    fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_output_chars: self.max_output_chars,
            parallel: self.parallel_tool_calls,
        }
    }
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default())
    }
}

#[derive(Clone)]
pub struct AgentRuntime {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: ToolRegistry,
    skills: Arc<SkillRegistry>,
    agent_types: Arc<AgentTypes>,
    limits: LoopLimits,
    events: Arc<EventBus>,
    workdir: PathBuf,
    preamble_override: Option<String>,
}

impl AgentRuntime {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: ToolRegistry,
        skills: Arc<SkillRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            skills,
            agent_types: Arc::new(AgentTypes::default()),
            limits: LoopLimits::default(),
            events: Arc::new(EventBus::default()),
            workdir: PathBuf::from("."),
            preamble_override: None,
        }
    }

    /// Wire a runtime from loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: ToolRegistry,
        skills: Arc<SkillRegistry>,
    ) -> Self {
        Self::new(provider, model, tools, skills)
            .with_temperature(config.default_temperature)
            .with_max_tokens(Some(config.default_max_tokens))
            .with_agent_types(AgentTypes::from_config(&config.subagents))
            .with_limits(LoopLimits::from_settings(&config.agent))
            .with_workdir(config.workdir())
            .with_preamble_override(config.identity.system_prompt_override.clone())
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_agent_types(mut self, agent_types: AgentTypes) -> Self {
        self.agent_types = Arc::new(agent_types);
        self
    }

    pub fn with_limits(mut self, limits: LoopLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Replace the generated top-level preamble. Subagent preambles are
    /// unaffected.
    pub fn with_preamble_override(mut self, preamble: Option<String>) -> Self {
        self.preamble_override = preamble;
        self
    }

    pub fn limits(&self) -> LoopLimits {
        self.limits
    }

    pub fn agent_types(&self) -> &AgentTypes {
        &self.agent_types
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The loop a user talks to, at depth 0.
    pub fn top_level_loop(&self) -> Result<AgentLoop, Error> {
        let preamble = match &self.preamble_override {
            Some(text) => text.clone(),
            None => preamble::top_level(&self.workdir, &self.skills, &self.agent_types),
        };
        let dispatcher = self.dispatcher(self.tools.clone(), 0)?;
        Ok(self.build_loop(preamble, dispatcher, self.limits.budget))
    }

    /// A loop for one subagent of the given type, running at `depth`.
    ///
    /// `Task` is left out of the catalog when a further spawn from this
    /// depth would hit the nesting limit.
    pub fn subagent_loop(&self, agent_type: &AgentType, depth: u32) -> Result<AgentLoop, Error> {
        let tools = match &agent_type.tools {
            ToolFilter::All => self.tools.clone(),
            ToolFilter::Only(names) => self.tools.subset(names),
        };
        let preamble = preamble::subagent(&self.workdir, agent_type);
        let dispatcher = self.dispatcher(tools, depth)?;
        Ok(self.build_loop(preamble, dispatcher, self.limits.subagent_budget))
    }

    /// A multi-turn session over the top-level loop.
    pub fn session(&self) -> Result<Session, Error> {
        Ok(Session::new(self.top_level_loop()?))
    }

    fn dispatcher(&self, tools: ToolRegistry, depth: u32) -> Result<Dispatcher, Error> {
        let spawner = if self.agent_types.is_empty() || depth >= self.limits.max_depth {
            None
        } else {
            Some(SubagentSpawner::new(self.clone()))
        };
        Ok(Dispatcher::new(
            tools,
            Arc::clone(&self.skills),
            spawner,
            self.limits.dispatch_settings(),
            Arc::clone(&self.events),
        )?)
    }

    fn build_loop(&self, preamble: String, dispatcher: Dispatcher, budget: Budget) -> AgentLoop {
        AgentLoop::new(Arc::clone(&self.provider), &self.model, preamble, dispatcher)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_budget(budget)
            .with_event_bus(Arc::clone(&self.events))
    }
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("tools", &self.tools)
            .field("skills", &self.skills.names())
            .field("agent_types", &self.agent_types.names())
            .field("limits", &self.limits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EchoTool, SequentialMockProvider};

    fn runtime() -> AgentRuntime {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(EchoTool)).unwrap();
        AgentRuntime::new(
            Arc::new(SequentialMockProvider::new(vec![])),
            "mock-model",
            tools,
            Arc::new(SkillRegistry::default()),
        )
        .with_agent_types(AgentTypes::from_config(
            &warmloop_config::AppConfig::default().subagents,
        ))
    }

    #[test]
    fn limits_follow_settings() {
        let settings = AgentSettings {
            max_iterations: 7,
            subagent_max_iterations: 3,
            max_depth: 2,
            ..AgentSettings::default()
        };
        let limits = LoopLimits::from_settings(&settings);
        assert_eq!(limits.budget.max_iterations, 7);
        assert_eq!(limits.subagent_budget.max_iterations, 3);
        assert_eq!(limits.max_depth, 2);
    }

    #[test]
    fn top_level_catalog_includes_protocol_tools() {
        let agent = runtime().top_level_loop().unwrap();
        let names: Vec<_> = agent.catalog().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["echo", "Skill", "Task"]);
    }

    #[test]
    fn zero_depth_hides_task() {
        let rt = runtime().with_limits(LoopLimits {
            max_depth: 0,
            ..LoopLimits::default()
        });
        let agent = rt.top_level_loop().unwrap();
        assert!(agent.catalog().iter().all(|d| d.name != "Task"));
    }

    #[test]
    fn subagent_tools_are_filtered() {
        let rt = runtime();
        let explore = rt.agent_types().get("explore").unwrap().clone();
        let agent = rt
            .with_limits(LoopLimits {
                max_depth: 2,
                ..LoopLimits::default()
            })
            .subagent_loop(&explore, 1)
            .unwrap();
        // explore only allows bash and read_file, neither of which is registered.
        let names: Vec<_> = agent.catalog().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["Skill", "Task"]);
        assert!(agent.preamble().starts_with("You are a explore subagent"));
    }

    #[test]
    fn preamble_override_replaces_top_level_only() {
        let rt = runtime().with_preamble_override(Some("Custom preamble".into()));
        assert_eq!(rt.top_level_loop().unwrap().preamble(), "Custom preamble");
        let code = rt.agent_types().get("code").unwrap().clone();
        let sub = rt.subagent_loop(&code, 1).unwrap();
        assert!(sub.preamble().starts_with("You are a code subagent"));
    }

    #[test]
    fn task_offered_only_below_depth_limit() {
        let has_task = |agent: &AgentLoop| agent.catalog().iter().any(|d| d.name == "Task");
        let code = runtime().agent_types().get("code").unwrap().clone();

        // Default max_depth 1: subagents cannot delegate further.
        let rt = runtime();
        assert!(has_task(&rt.top_level_loop().unwrap()));
        assert!(!has_task(&rt.subagent_loop(&code, 1).unwrap()));

        let rt = runtime().with_limits(LoopLimits {
            max_depth: 2,
            ..LoopLimits::default()
        });
        assert!(has_task(&rt.subagent_loop(&code, 1).unwrap()));
        assert!(!has_task(&rt.subagent_loop(&code, 2).unwrap()));
    }
}
