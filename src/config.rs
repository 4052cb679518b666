use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::locale::Language;

/// Application configuration, loaded from `~/.saathi/config.toml` and
/// overridable through the environment. The API credential is injected,
/// never embedded in source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the generative-language API.
    pub api_base_url: String,

    /// Model identifier appended to the endpoint path.
    pub model: String,

    /// API key. Environment variables (`SAATHI_API_KEY`, `GEMINI_API_KEY`)
    /// take precedence over this value.
    pub api_key: Option<String>,

    /// Display language at startup.
    pub default_language: Language,

    /// Per-character reveal cadence in milliseconds.
    pub reveal_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            default_language: Language::En,
            reveal_interval_ms: 20,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".saathi").join("config.toml"))
    }

    /// Load configuration, falling back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the API key: environment first, then the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("SAATHI_API_KEY")
            .ok()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| self.api_key.clone())
    }

    /// Startup credential check. A missing key fails here, at construction
    /// time, never in the middle of a turn.
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.api_key().ok_or(ConfigError::MissingApiKey)
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hosted_api() {
        let config = Config::default();
        assert!(config.api_base_url.starts_with("https://"));
        assert_eq!(config.default_language, Language::En);
        assert_eq!(config.reveal_interval(), Duration::from_millis(20));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_key = "k-123"
            default_language = "hi"
            "#,
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.default_language, Language::Hi);
        assert_eq!(config.model, Config::default().model);
    }

    #[test]
    fn configured_key_satisfies_the_startup_check() {
        let config = Config {
            api_key: Some("k-123".into()),
            ..Config::default()
        };
        assert!(config.require_api_key().is_ok());
    }
}
