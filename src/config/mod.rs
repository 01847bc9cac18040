//! Configuration (layered: code > env > TOML file > defaults).

use std::path::{Path, PathBuf};
use std::str::FromStr;
#[cfg(feature = "openai")]
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ScouterError;
#[cfg(feature = "openai")]
use crate::provider::{ClientCache, ModelClient};
use crate::util::retry::RetryPolicy;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenAI-compatible backends the runtime can talk to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProvider {
    #[default]
    OpenAi,
    OpenRouter,
}

impl LlmProvider {
    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

/// Model client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl LlmSettings {
    /// The configured API key, or an error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str, ScouterError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ScouterError::Configuration(format!(
                    "missing API key: set {}",
                    self.provider.api_key_var()
                ))
            })
    }

    /// Explicit base URL, else the provider's default (`None` = client default).
    pub fn resolved_base_url(&self) -> Option<String> {
        match (&self.base_url, self.provider) {
            (Some(url), _) => Some(url.clone()),
            (None, LlmProvider::OpenRouter) => Some(OPENROUTER_BASE_URL.to_string()),
            (None, LlmProvider::OpenAi) => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries.saturating_add(1))
    }

    /// Shared client for these credentials.
    #[cfg(feature = "openai")]
    pub fn client(&self, cache: &ClientCache) -> Result<Arc<dyn ModelClient>, ScouterError> {
        let api_key = self.require_api_key()?;
        let base_url = self.resolved_base_url();
        let timeout = self.timeout();
        Ok(cache.get_or_insert_with(api_key, base_url.as_deref(), || {
            Arc::new(
                crate::provider::openai::OpenAiClient::new(api_key, base_url.clone())
                    .with_request_timeout(timeout),
            )
        }))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScouterConfig {
    pub llm: LlmSettings,
    /// `tracing` filter directive for applications that install a subscriber.
    pub log: Option<String>,
}

impl ScouterConfig {
    /// Defaults overlaid with the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ScouterError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Config file at [`ScouterConfig::default_path`] (if any), then the environment.
    pub fn load() -> Result<Self, ScouterError> {
        let _ = dotenvy::dotenv();
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ScouterError> {
        toml::from_str(raw)
            .map_err(|e| ScouterError::Configuration(format!("invalid config file: {e}")))
    }

    pub fn load_file(path: &Path) -> Result<Self, ScouterError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScouterError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// `<config dir>/scouter/config.toml` for the current user.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "scouter")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Overlay variables from `lookup` onto this config.
    ///
    /// `OPENROUTER_API_KEY` falls back to `OPENAI_API_KEY` when the provider
    /// is OpenRouter.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ScouterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(provider) = var("LLM_PROVIDER") {
            self.llm.provider = LlmProvider::from_str(provider.trim()).map_err(|_| {
                ScouterError::Configuration(format!(
                    "unsupported LLM_PROVIDER '{provider}' (expected openai or openrouter)"
                ))
            })?;
        }

        let (key, url) = match self.llm.provider {
            LlmProvider::OpenAi => (var("OPENAI_API_KEY"), var("OPENAI_BASE_URL")),
            LlmProvider::OpenRouter => (
                var("OPENROUTER_API_KEY").or_else(|| var("OPENAI_API_KEY")),
                var("OPENROUTER_BASE_URL"),
            ),
        };
        if key.is_some() {
            self.llm.api_key = key;
        }
        if url.is_some() {
            self.llm.base_url = url;
        }
        if let Some(model) = var("SCOUTER_MODEL") {
            self.llm.model = model;
        }
        if let Some(log) = var("SCOUTER_LOG") {
            self.log = Some(log);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = ScouterConfig::default();
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.llm.retry_policy().max_attempts, 4);
        assert!(config.llm.resolved_base_url().is_none());
    }

    #[test]
    fn openrouter_falls_back_to_openai_key_and_default_url() {
        let mut config = ScouterConfig::default();
        config
            .apply_env(env(&[("LLM_PROVIDER", "OpenRouter"), ("OPENAI_API_KEY", "sk-openai")]))
            .unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenRouter);
        assert_eq!(config.llm.require_api_key().unwrap(), "sk-openai");
        assert_eq!(config.llm.resolved_base_url().as_deref(), Some(OPENROUTER_BASE_URL));
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let mut config = ScouterConfig::default();
        let err = config.apply_env(env(&[("LLM_PROVIDER", "bedrock")])).unwrap_err();
        assert!(matches!(err, ScouterError::Configuration(_)));
    }

    #[test]
    fn missing_key_names_the_variable() {
        let mut settings = LlmSettings::default();
        settings.provider = LlmProvider::OpenRouter;

        let err = settings.require_api_key().unwrap_err();
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn toml_file_then_env_overlay() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "log = \"scouter=debug\"\n\n[llm]\nprovider = \"openrouter\"\nmodel = \"qwen/qwen3\"\nmax_retries = 1\n",
        )
        .unwrap();

        let mut config = ScouterConfig::load_file(&path).unwrap();
        assert_eq!(config.llm.model, "qwen/qwen3");
        assert_eq!(config.llm.temperature, 0.7);
        assert_eq!(config.log.as_deref(), Some("scouter=debug"));

        config
            .apply_env(env(&[("SCOUTER_MODEL", "gpt-4o"), ("OPENROUTER_API_KEY", "sk-or")]))
            .unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-or"));
        assert_eq!(config.llm.retry_policy().max_attempts, 2);
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(matches!(
            ScouterConfig::from_toml_str("[llm\nmodel ="),
            Err(ScouterError::Configuration(_))
        ));
    }

    #[cfg(feature = "openai")]
    #[test]
    fn client_cache_reuses_clients_for_same_credentials() {
        let cache = ClientCache::new();
        let mut settings = LlmSettings::default();
        settings.api_key = Some("sk-test".into());

        let first = settings.client(&cache).unwrap();
        let second = settings.client(&cache).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "openai");
    }
}
