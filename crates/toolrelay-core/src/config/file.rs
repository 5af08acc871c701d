//! File-based configuration (YAML)

use std::fs;
use std::path::{Path, PathBuf};

use super::error::{ConfigError, ConfigResult};
use super::settings::RelayConfig;

/// A YAML configuration file
///
/// # Example
///
/// ```no_run
/// use toolrelay_core::config::FileConfig;
///
/// let config = FileConfig::user().load()?.apply_env();
/// # Ok::<(), toolrelay_core::config::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
}

impl FileConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// User-level config (~/.config/toolrelay/config.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("toolrelay").join("config.yaml"))
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and validate. A missing file yields the defaults.
    pub fn load(&self) -> ConfigResult<RelayConfig> {
        if !self.exists() {
            return Ok(RelayConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config: RelayConfig = if content.trim().is_empty() {
            RelayConfig::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Write `config`, creating parent directories as needed
    pub fn save(&self, config: &RelayConfig) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize YAML: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let file = FileConfig::new(dir.path().join("config.yaml"));
        assert!(!file.exists());
        assert_eq!(file.load().unwrap(), RelayConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let file = FileConfig::new(dir.path().join("nested").join("config.yaml"));

        let mut config = RelayConfig::default();
        config.backend.model = "llama3.1:8b".into();
        config.system_prompt = Some("Answer in plain text.".into());
        file.save(&config).unwrap();

        assert!(file.exists());
        assert_eq!(file.load().unwrap(), config);
    }

    #[test]
    fn yaml_is_human_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "backend:\n  provider: openai\n  model: gpt-4o-mini\n  api_base: http://localhost:8000/v1/\nremote_servers:\n  - name: files\n    url: http://localhost:8931/mcp\n",
        )
        .unwrap();

        let config = FileConfig::new(&path).load().unwrap();
        assert_eq!(config.backend.provider, "openai");
        assert_eq!(config.backend.api_base.as_deref(), Some("http://localhost:8000/v1/"));
        assert_eq!(config.remote_servers().unwrap()[0].name, "files");
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "backend: [unterminated").unwrap();
        assert!(matches!(
            FileConfig::new(&path).load(),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "follow_up_max_tokens: 0\n").unwrap();
        assert!(matches!(
            FileConfig::new(&path).load(),
            Err(ConfigError::Invalid(_))
        ));
    }
}
