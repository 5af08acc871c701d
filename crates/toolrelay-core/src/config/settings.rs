//! Configuration schema

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::backend::BackendConfig;
use crate::logging::LogLevel;
use crate::mcp::RemoteServer;
use crate::orchestrator::{OrchestratorSettings, DEFAULT_FOLLOW_UP_MAX_TOKENS};

pub const DEFAULT_PROVIDER: &str = "ollama";
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:14b";

/// Used when the config leaves `system_prompt` unset. An empty string disables it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools when they help. \
Answer in plain text without Markdown formatting.";

pub const ENV_PROVIDER: &str = "TOOLRELAY_PROVIDER";
pub const ENV_MODEL: &str = "TOOLRELAY_MODEL";
pub const ENV_API_BASE: &str = "TOOLRELAY_API_BASE";
pub const ENV_API_KEY: &str = "TOOLRELAY_API_KEY";

/// Top-level configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    /// System preamble placed before every query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Output budget of the streamed follow-up completion
    #[serde(default = "default_follow_up_max_tokens")]
    pub follow_up_max_tokens: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Remote MCP servers registered next to the built-in providers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_servers: Vec<RemoteServerConfig>,
}

/// Model backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Override for the provider's default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// A remote MCP server, reached by URL or Unix socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_follow_up_max_tokens() -> u32 {
    DEFAULT_FOLLOW_UP_MAX_TOKENS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_base: None,
            api_key: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            backend: BackendSettings::default(),
            system_prompt: None,
            follow_up_max_tokens: default_follow_up_max_tokens(),
            log_level: default_log_level(),
            remote_servers: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Apply `TOOLRELAY_*` overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `TOOLRELAY_*` overrides from an arbitrary lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(provider) = lookup(ENV_PROVIDER) {
            self.backend.provider = provider;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.backend.model = model;
        }
        if let Some(base) = lookup(ENV_API_BASE) {
            self.backend.api_base = Some(base);
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.backend.api_key = Some(key);
        }
        self
    }

    pub fn log_level(&self) -> ConfigResult<LogLevel> {
        LogLevel::parse(&self.log_level)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown log level: {}", self.log_level)))
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            provider: self.backend.provider.clone(),
            api_key: self.backend.api_key.clone(),
            api_base: self.backend.api_base.clone(),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let mut settings = OrchestratorSettings::new(&self.backend.model)
            .with_follow_up_max_tokens(self.follow_up_max_tokens);
        let prompt = self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        if !prompt.trim().is_empty() {
            settings = settings.with_system_prompt(prompt);
        }
        settings
    }

    pub fn remote_servers(&self) -> ConfigResult<Vec<RemoteServer>> {
        self.remote_servers
            .iter()
            .map(RemoteServerConfig::to_remote)
            .collect()
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> ConfigResult<()> {
        if self.backend.model.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.model must not be empty".into()));
        }
        if self.follow_up_max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "follow_up_max_tokens must be greater than zero".into(),
            ));
        }
        self.log_level()?;
        self.remote_servers()?;
        Ok(())
    }
}

impl RemoteServerConfig {
    /// Exactly one of `url` and `socket` must be set
    pub fn to_remote(&self) -> ConfigResult<RemoteServer> {
        match (&self.url, &self.socket) {
            (Some(url), None) => Ok(RemoteServer::url(&self.name, url)),
            (None, Some(socket)) => Ok(RemoteServer::socket(&self.name, socket)),
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "remote server {} sets both url and socket",
                self.name
            ))),
            (None, None) => Err(ConfigError::Invalid(format!(
                "remote server {} needs a url or a socket",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::RemoteTarget;
    use std::collections::HashMap;

    #[test]
    fn defaults_target_local_ollama() {
        let config = RelayConfig::default();
        assert_eq!(config.backend.provider, "ollama");
        assert_eq!(config.backend.model, "qwen2.5-coder:14b");
        assert_eq!(config.follow_up_max_tokens, 512);
        assert_eq!(config.log_level().unwrap(), LogLevel::Info);
        config.validate().unwrap();
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let config: RelayConfig = serde_yaml::from_str("backend:\n  model: llama3.1\n").unwrap();
        assert_eq!(config.backend.model, "llama3.1");
        assert_eq!(config.backend.provider, "ollama");
        assert_eq!(config.follow_up_max_tokens, 512);
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            (ENV_MODEL, "gpt-4o-mini"),
            (ENV_PROVIDER, "openai"),
            (ENV_API_KEY, "sk-test"),
            (ENV_API_BASE, "  "),
        ]
        .into_iter()
        .collect();

        let config = RelayConfig::default().apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.backend.model, "gpt-4o-mini");
        assert_eq!(config.backend.provider, "openai");
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-test"));
        // Blank values are ignored
        assert_eq!(config.backend.api_base, None);
    }

    #[test]
    fn remote_servers_need_exactly_one_target() {
        let ok = RemoteServerConfig {
            name: "files".into(),
            url: None,
            socket: Some("/tmp/files.sock".into()),
        };
        assert_eq!(
            ok.to_remote().unwrap().target,
            RemoteTarget::Socket("/tmp/files.sock".into())
        );

        let neither = RemoteServerConfig {
            name: "nothing".into(),
            url: None,
            socket: None,
        };
        assert!(matches!(neither.to_remote(), Err(ConfigError::Invalid(_))));

        let config = RelayConfig {
            remote_servers: vec![neither],
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn orchestrator_settings_follow_config() {
        let config = RelayConfig {
            system_prompt: Some("Answer in plain text.".into()),
            follow_up_max_tokens: 128,
            ..RelayConfig::default()
        };
        let settings = config.orchestrator_settings();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.system_prompt.as_deref(), Some("Answer in plain text."));
        assert_eq!(settings.follow_up_max_tokens, 128);

        let defaulted = RelayConfig::default().orchestrator_settings();
        assert_eq!(defaulted.system_prompt.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));

        let disabled = RelayConfig {
            system_prompt: Some(String::new()),
            ..RelayConfig::default()
        };
        assert_eq!(disabled.orchestrator_settings().system_prompt, None);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let config = RelayConfig {
            log_level: "chatty".into(),
            ..RelayConfig::default()
        };
        assert!(matches!(config.log_level(), Err(ConfigError::Invalid(_))));
    }
}
