//! Configuration loading, validation, and resolution for neo.
//!
//! Loads a TOML file (default `config.toml`, or `NEO_CONFIG`), fills in
//! defaults, discovers skills under `skills.directory`, resolves the
//! high-priority list, then applies `NEO_MODEL` / `NEO_API_KEY` overrides.
//! The agent receives a fully resolved [`AppConfig`] and never parses files.

pub mod skills;

use neo_core::skill::{SkillEntry, UnmatchedPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum entries kept from any configured or discovered path list.
pub const MAX_PATHS: usize = 32;

/// Default per-file cap for bootstrap documents.
pub const DEFAULT_BOOTSTRAP_MAX_CHARS: i64 = 8000;

/// Default cap for the memory file.
pub const DEFAULT_MEMORY_MAX_CHARS: i64 = 4000;

/// Default number of user/assistant turn pairs kept by the daemon.
pub const DEFAULT_SESSION_MAX_TURNS: i64 = 10;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "NEO_CONFIG";

/// Config path used when neither `--config` nor `NEO_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub skills: SkillsConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Upstream model endpoint and generation parameters.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider label, used in logs only
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL; requests go to `<base_url>/chat/completions`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model_name")]
    pub name: String,

    /// Sent as `Authorization: Bearer <key>` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,

    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_base_url() -> String {
    "http://127.0.0.1:11434/v1".into()
}
fn default_model_name() -> String {
    "qwen3:8b".into()
}
fn default_max_tokens() -> i64 {
    neo_core::provider::DEFAULT_MAX_TOKENS
}
fn default_temperature() -> f64 {
    neo_core::provider::DEFAULT_TEMPERATURE
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            name: default_model_name(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("name", &self.name)
            .field("api_key", &redact(&self.api_key))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Documents injected in full on every exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    #[serde(default = "default_bootstrap_max_chars")]
    pub max_chars_per_file: i64,
}

fn default_bootstrap_max_chars() -> i64 {
    DEFAULT_BOOTSTRAP_MAX_CHARS
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            paths: vec![],
            max_chars_per_file: DEFAULT_BOOTSTRAP_MAX_CHARS,
        }
    }
}

/// Skill sources and inclusion policy.
///
/// After [`AppConfig::load_from`], `entries` holds the resolved list:
/// discovered skills first, then the explicitly listed ones, with
/// `high_priority` already applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillsConfig {
    #[serde(default)]
    pub entries: Vec<SkillEntry>,

    /// Scanned for `<name>/SKILL.md` subdirectories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub unmatched: UnmatchedPolicy,

    /// Skill names, paths, or path fragments to promote to high priority
    #[serde(default)]
    pub high_priority: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_memory_max_chars")]
    pub max_chars: i64,
}

fn default_memory_max_chars() -> i64 {
    DEFAULT_MEMORY_MAX_CHARS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_chars: DEFAULT_MEMORY_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_max_turns")]
    pub max_turns: i64,
}

fn default_session_max_turns() -> i64 {
    DEFAULT_SESSION_MAX_TURNS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_SESSION_MAX_TURNS,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load and resolve configuration from a specific file, without env overrides.
    ///
    /// A missing or unreadable file is an error: the agent never runs on a
    /// partial configuration.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        config.resolve_skills();

        tracing::debug!(
            path = %path.display(),
            skills = config.skills.entries.len(),
            bootstrap = config.bootstrap.paths.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse, default, and validate a TOML document. Skills are not resolved.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Replace non-positive limits with their defaults and cap path lists.
    fn apply_defaults(&mut self) {
        if self.model.max_tokens <= 0 {
            self.model.max_tokens = default_max_tokens();
        }
        if self.bootstrap.max_chars_per_file <= 0 {
            self.bootstrap.max_chars_per_file = DEFAULT_BOOTSTRAP_MAX_CHARS;
        }
        if self.memory.max_chars <= 0 {
            self.memory.max_chars = DEFAULT_MEMORY_MAX_CHARS;
        }
        if self.session.max_turns <= 0 {
            self.session.max_turns = DEFAULT_SESSION_MAX_TURNS;
        }
        skills::cap_list(&mut self.bootstrap.paths, "bootstrap.paths");
        skills::cap_list(&mut self.skills.entries, "skills.entries");
        skills::cap_list(&mut self.skills.high_priority, "skills.high_priority");
    }

    /// Discover skills, de-duplicate, and apply the high-priority list.
    pub fn resolve_skills(&mut self) {
        let discovered = match &self.skills.directory {
            Some(dir) if !dir.as_os_str().is_empty() => skills::discover(dir),
            _ => vec![],
        };
        let explicit = std::mem::take(&mut self.skills.entries);
        let mut entries = skills::merge(discovered, explicit);
        skills::apply_high_priority(&mut entries, &self.skills.high_priority);
        self.skills.entries = entries;
    }

    /// Apply `NEO_MODEL` and `NEO_API_KEY` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("NEO_MODEL").filter(|v| !v.is_empty()) {
            self.model.name = model;
        }
        if let Some(key) = lookup("NEO_API_KEY").filter(|v| !v.is_empty()) {
            self.model.api_key = Some(key);
        }
    }

    /// Override the model name (the `--model` flag).
    pub fn override_model(&mut self, name: impl Into<String>) {
        self.model.name = name.into();
    }

    /// The session window as a turn count, never zero.
    pub fn session_max_turns(&self) -> usize {
        usize::try_from(self.session.max_turns)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SESSION_MAX_TURNS as usize)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.model.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "model.base_url must be an http(s) URL, got '{}'",
                self.model.base_url
            )));
        }

        if self.model.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model.name must not be empty".into(),
            ));
        }

        if self.skills.entries.iter().any(|e| e.path.as_os_str().is_empty()) {
            return Err(ConfigError::ValidationError(
                "skills.entries contains an empty path".into(),
            ));
        }

        Ok(())
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

impl From<ConfigError> for neo_core::Error {
    fn from(err: ConfigError) -> Self {
        neo_core::Error::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_core::skill::SkillPriority;
    use std::collections::HashMap;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.model.base_url, "http://127.0.0.1:11434/v1");
        assert_eq!(config.model.name, "qwen3:8b");
        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.bootstrap.max_chars_per_file, 8000);
        assert_eq!(config.memory.max_chars, 4000);
        assert_eq!(config.session.max_turns, 10);
        assert_eq!(config.skills.unmatched, UnmatchedPolicy::Index);
        assert!(config.memory.path.is_none());
    }

    #[test]
    fn full_document_parses() {
        let toml_str = r#"
[model]
provider = "openrouter"
base_url = "https://openrouter.ai/api/v1"
name = "qwen/qwen3-32b"
api_key = "sk-test"
max_tokens = 2048
temperature = 0.3

[bootstrap]
paths = ["AGENTS.md", "USER.md"]
max_chars_per_file = 1000

[skills]
unmatched = "skip"
high_priority = ["ops"]

[[skills.entries]]
path = "skills/ops/SKILL.md"

[[skills.entries]]
path = "skills/translate/SKILL.md"
priority = "high"

[memory]
path = "MEMORY.md"
max_chars = 500

[session]
max_turns = 3
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.model.name, "qwen/qwen3-32b");
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model.max_tokens, 2048);
        assert_eq!(config.bootstrap.paths.len(), 2);
        assert_eq!(config.bootstrap.max_chars_per_file, 1000);
        assert_eq!(config.skills.unmatched, UnmatchedPolicy::Skip);
        assert_eq!(config.skills.entries.len(), 2);
        assert_eq!(config.skills.entries[1].priority, SkillPriority::High);
        assert_eq!(config.memory.path, Some(PathBuf::from("MEMORY.md")));
        assert_eq!(config.session_max_turns(), 3);
    }

    #[test]
    fn non_positive_limits_replaced() {
        let toml_str = r#"
[model]
max_tokens = -5
[bootstrap]
max_chars_per_file = 0
[memory]
max_chars = -1
[session]
max_turns = 0
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.bootstrap.max_chars_per_file, 8000);
        assert_eq!(config.memory.max_chars, 4000);
        assert_eq!(config.session.max_turns, 10);
        assert_eq!(config.session_max_turns(), 10);
    }

    #[test]
    fn out_of_range_temperature_is_kept_for_the_provider_to_normalize() {
        let config = AppConfig::from_toml_str("[model]\ntemperature = 5.0\n").unwrap();
        assert!((config.model.temperature - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_base_url_rejected() {
        let err = AppConfig::from_toml_str("[model]\nbase_url = \"localhost:11434\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[model\nname = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = AppConfig::load_from(Path::new("/nonexistent/neo/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("/nonexistent/neo/config.toml"));
    }

    #[test]
    fn load_from_file_resolves_skills() {
        let dir = tempfile::tempdir().unwrap();
        let skills_dir = dir.path().join("skills");
        std::fs::create_dir_all(skills_dir.join("nanjing")).unwrap();
        std::fs::write(skills_dir.join("nanjing/SKILL.md"), "Nanjing guide").unwrap();

        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            format!(
                "[skills]\ndirectory = {:?}\nhigh_priority = [\"nanjing\"]\n",
                skills_dir.display().to_string()
            ),
        )
        .unwrap();

        let config = AppConfig::load_from(&config_path).unwrap();
        assert_eq!(config.skills.entries.len(), 1);
        assert!(config.skills.entries[0].is_high_priority());
        assert_eq!(config.skills.entries[0].name(), Some("nanjing"));
    }

    #[test]
    fn env_overrides_model_and_key() {
        let env: HashMap<&str, &str> =
            HashMap::from([("NEO_MODEL", "llama3:70b"), ("NEO_API_KEY", "sk-env")]);
        let mut config = AppConfig::default();
        config.apply_env_with(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.model.name, "llama3:70b");
        assert_eq!(config.model.api_key.as_deref(), Some("sk-env"));
    }

    #[test]
    fn empty_env_values_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_with(|_| Some(String::new()));
        assert_eq!(config.model.name, "qwen3:8b");
        assert!(config.model.api_key.is_none());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut config = AppConfig::default();
        config.model.api_key = Some("sk-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn config_error_converts_to_core_error() {
        let err: neo_core::Error = ConfigError::ValidationError("bad".into()).into();
        assert!(err.to_string().contains("bad"));
    }
}
