//! Subagent profiles.

use warmloop_config::SubagentConfig;

/// Which ordinary tools a profile may use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFilter {
    All,
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentType {
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub tools: ToolFilter,
}

impl From<&SubagentConfig> for AgentType {
    fn from(config: &SubagentConfig) -> Self {
        let tools = if config.tools.iter().any(|t| t == "*") {
            ToolFilter::All
        } else {
            ToolFilter::Only(config.tools.clone())
        };
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            prompt: config.prompt.clone(),
            tools,
        }
    }
}

/// The agent types the `Task` tool accepts, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentTypes {
    types: Vec<AgentType>,
}

impl AgentTypes {
    pub fn new(types: Vec<AgentType>) -> Self {
        Self { types }
    }

    pub fn from_config(configs: &[SubagentConfig]) -> Self {
        Self::new(configs.iter().map(AgentType::from).collect())
    }

    pub fn get(&self, name: &str) -> Option<&AgentType> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentType> {
        self.types.iter()
    }

    /// One `- name: description` line per type.
    pub fn describe(&self) -> String {
        if self.types.is_empty() {
            return "(no subagents available)".into();
        }
        self.types
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
