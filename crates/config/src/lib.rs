//! Configuration loading, validation, and management for warmloop.
//!
//! Loads configuration from `~/.warmloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.warmloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override for the default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Loop budgets and dispatch limits
    #[serde(default)]
    pub agent: AgentSettings,

    /// Knowledge package discovery
    #[serde(default)]
    pub skills: SkillsConfig,

    /// Sandbox settings for the built-in tools
    #[serde(default)]
    pub autonomy: AutonomyConfig,

    /// Preamble settings
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Subagent profiles available to the `Task` tool
    #[serde(default = "default_subagents")]
    pub subagents: Vec<SubagentConfig>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    8000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("skills", &self.skills)
            .field("autonomy", &self.autonomy)
            .field("identity", &self.identity)
            .field("subagents", &self.subagents)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Budgets and limits for the orchestration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Model calls allowed per top-level run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Total tokens allowed per top-level run (unset = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens_budget: Option<u64>,

    /// Deepest subagent nesting allowed (0 disables subagents)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Model calls allowed per subagent run
    #[serde(default = "default_subagent_iterations")]
    pub subagent_max_iterations: u32,

    /// Total tokens allowed per subagent run (unset = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subagent_max_tokens: Option<u64>,

    /// Upper bound on any single tool result, in characters
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,

    /// Timeout for blocking tool handlers
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Run the tool calls of one response concurrently
    #[serde(default = "default_true")]
    pub parallel_tool_calls: bool,
}

fn default_max_iterations() -> u32 {
    25
}
fn default_max_depth() -> u32 {
    1
}
fn default_subagent_iterations() -> u32 {
    15
}
fn default_max_output_chars() -> usize {
    50_000
}
fn default_tool_timeout() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_tokens_budget: None,
            max_depth: default_max_depth(),
            subagent_max_iterations: default_subagent_iterations(),
            subagent_max_tokens: None,
            max_output_chars: default_max_output_chars(),
            tool_timeout_secs: default_tool_timeout(),
            parallel_tool_calls: true,
        }
    }
}

/// Where knowledge packages are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    /// Directories scanned for `<name>/SKILL.md`, in priority order.
    /// Relative paths resolve against the working directory; `~` expands.
    #[serde(default = "default_skill_dirs")]
    pub dirs: Vec<String>,

    /// Longest description accepted for a package
    #[serde(default = "default_max_description_chars")]
    pub max_description_chars: usize,
}

fn default_skill_dirs() -> Vec<String> {
    vec!["skills".into(), "~/.warmloop/skills".into()]
}
fn default_max_description_chars() -> usize {
    1024
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            dirs: default_skill_dirs(),
            max_description_chars: default_max_description_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyConfig {
    /// Confine file tools to the working directory
    #[serde(default = "default_true")]
    pub workspace_only: bool,

    /// If non-empty, only these base commands may run in `bash`
    #[serde(default)]
    pub allowed_commands: Vec<String>,

    /// Substrings that make `bash` refuse a command outright
    #[serde(default = "default_denied_patterns")]
    pub denied_patterns: Vec<String>,
}

fn default_denied_patterns() -> Vec<String> {
    vec![
        "rm -rf /".into(),
        "sudo ".into(),
        "shutdown".into(),
        "reboot".into(),
        "mkfs".into(),
        "> /dev/".into(),
        ":(){".into(),
    ]
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            workspace_only: true,
            allowed_commands: vec![],
            denied_patterns: default_denied_patterns(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Replace the generated preamble entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Working directory for tools (default: current directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
}

/// A subagent profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubagentConfig {
    /// Agent type name passed as `agent_type` to the `Task` tool
    pub name: String,

    /// One-line description shown in the catalog
    pub description: String,

    /// Profile instructions placed in the subagent preamble
    pub prompt: String,

    /// Ordinary tools available to this profile; `["*"]` means all
    #[serde(default = "default_all_tools")]
    pub tools: Vec<String>,
}

fn default_all_tools() -> Vec<String> {
    vec!["*".into()]
}

fn default_subagents() -> Vec<SubagentConfig> {
    vec![
        SubagentConfig {
            name: "explore".into(),
            description: "Read-only agent for exploring code, finding files, searching".into(),
            prompt: "You are an exploration agent. Search and analyze, but never modify files. Return a concise summary.".into(),
            tools: vec!["bash".into(), "read_file".into()],
        },
        SubagentConfig {
            name: "code".into(),
            description: "Full agent for implementing features and fixing bugs".into(),
            prompt: "You are a coding agent. Implement the requested changes efficiently.".into(),
            tools: default_all_tools(),
        },
        SubagentConfig {
            name: "plan".into(),
            description: "Planning agent for designing implementation strategies".into(),
            prompt: "You are a planning agent. Analyze the codebase and output a numbered implementation plan. Do NOT make changes.".into(),
            tools: vec!["bash".into(), "read_file".into()],
        },
    ]
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.warmloop/config.toml).
    ///
    /// Also checks environment variables:
    /// - `WARMLOOP_API_KEY` (highest priority), then `ANTHROPIC_API_KEY`
    /// - `ANTHROPIC_BASE_URL`
    /// - `WARMLOOP_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("WARMLOOP_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }

        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            self.api_url = Some(url);
        }

        if let Ok(model) = std::env::var("WARMLOOP_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".warmloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 || self.agent.subagent_max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "iteration budgets must be at least 1".into(),
            ));
        }

        if self.agent.max_tokens_budget == Some(0) || self.agent.subagent_max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "token budgets must be at least 1 (omit them for no limit)".into(),
            ));
        }

        if self.agent.max_output_chars < 256 {
            return Err(ConfigError::ValidationError(
                "agent.max_output_chars must be at least 256".into(),
            ));
        }

        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "agent.tool_timeout_secs must be > 0".into(),
            ));
        }

        if self.skills.max_description_chars == 0 {
            return Err(ConfigError::ValidationError(
                "skills.max_description_chars must be > 0".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for agent in &self.subagents {
            if agent.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "subagent name must not be empty".into(),
                ));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate subagent type '{}'",
                    agent.name
                )));
            }
        }

        Ok(())
    }

    /// API key for the default provider: provider section first, then top level.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.resolved_api_key().is_some()
    }

    /// Working directory for tools.
    pub fn workdir(&self) -> PathBuf {
        match &self.identity.workdir {
            Some(dir) => expand_path(dir, Path::new(".")),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Skill directories, resolved against `workdir`.
    pub fn skill_dirs(&self, workdir: &Path) -> Vec<PathBuf> {
        self.skills.dirs.iter().map(|d| expand_path(d, workdir)).collect()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentSettings::default(),
            skills: SkillsConfig::default(),
            autonomy: AutonomyConfig::default(),
            identity: IdentityConfig::default(),
            subagents: default_subagents(),
            providers: HashMap::new(),
        }
    }
}

/// Expand `~` and resolve relative paths against `base`.
pub fn expand_path(path: &str, base: &Path) -> PathBuf {
    if path == "~" {
        return dirs_home();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return dirs_home().join(rest);
    }
    let p = PathBuf::from(path);
    if p.is_absolute() { p } else { base.join(p) }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
