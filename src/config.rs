// ============================================================================
// File: src/config.rs
// Configuration structures, loading and validation
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

/// Base URL of the OpenRouter API
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Model used when a call does not name one
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-8b-instruct:free";

/// Environment variables consulted for the API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["OPENROUTER_API_KEY", "VITE_OPENROUTER_API_KEY"];

/// Main configuration structure, optionally loaded from a JSON file
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// OpenRouter API key, sent as a bearer credential
    pub api_key: String,

    /// Base URL of the chat-completion provider
    pub base_url: String,

    /// Model identifier used unless a call overrides it
    pub default_model: String,

    /// Sent as `HTTP-Referer` so the provider can attribute traffic
    pub site_url: String,

    /// Sent as `X-Title`
    pub app_title: String,

    /// Sampling parameters applied to every request
    pub sampling: SamplingParams,
}

/// Fixed sampling parameters for chat completions
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 800,
            top_p: 0.8,
            frequency_penalty: 0.3,
            presence_penalty: 0.3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: OPENROUTER_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            site_url: "http://localhost:5173".to_string(),
            app_title: "QuantiCure Medical Platform".to_string(),
            sampling: SamplingParams::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the file
    /// is absent and `required` is false. The API key from the environment
    /// always wins over the file.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else if required {
            anyhow::bail!("Config file {} does not exist", path.display());
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };

        if let Some(key) = api_key_from_env() {
            config.api_key = key;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "OpenRouter API key is required (set {} or api_key in the config file)",
                API_KEY_ENV_VARS[0]
            ));
        }

        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Base URL must not be empty"));
        }

        if self.default_model.trim().is_empty() {
            return Err(anyhow::anyhow!("Default model must not be empty"));
        }

        for (name, value) in [
            ("api_key", format!("Bearer {}", self.api_key)),
            ("site_url", self.site_url.clone()),
            ("app_title", self.app_title.clone()),
        ] {
            if HeaderValue::from_str(&value).is_err() {
                return Err(anyhow::anyhow!(
                    "{} contains characters that cannot be sent in an HTTP header",
                    name
                ));
            }
        }

        self.sampling.validate()
    }
}

impl SamplingParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow::anyhow!("Temperature must be between 0.0 and 2.0"));
        }

        if self.top_p <= 0.0 || self.top_p > 1.0 {
            return Err(anyhow::anyhow!("top_p must be in (0.0, 1.0]"));
        }

        for (name, value) in [
            ("frequency_penalty", self.frequency_penalty),
            ("presence_penalty", self.presence_penalty),
        ] {
            if !(-2.0..=2.0).contains(&value) {
                return Err(anyhow::anyhow!("{} must be between -2.0 and 2.0", name));
            }
        }

        if self.max_tokens == 0 {
            return Err(anyhow::anyhow!("max_tokens must be greater than zero"));
        }

        Ok(())
    }
}

fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> Config {
        Config {
            api_key: "sk-test".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_fixed_sampling() {
        let sampling = SamplingParams::default();
        assert_eq!(sampling.temperature, 0.5);
        assert_eq!(sampling.max_tokens, 800);
        assert_eq!(sampling.top_p, 0.8);
        assert_eq!(sampling.frequency_penalty, 0.3);
        assert_eq!(sampling.presence_penalty, 0.3);

        let config = Config::default();
        assert_eq!(config.base_url, OPENROUTER_BASE_URL);
        assert_eq!(config.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn validate_requires_api_key() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("API key is required"));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_values_unusable_as_headers() {
        let mut config = valid_config();
        config.app_title = "QuantiCure\nMedical".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("app_title"));

        let mut config = valid_config();
        config.site_url = "http://localhost\r\n:5173".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.api_key = "sk-\u{7f}".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_sampling() {
        let mut config = valid_config();
        config.sampling.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.sampling.top_p = 0.0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.sampling.presence_penalty = -3.0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.sampling.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_model": "openai/gpt-4o-mini", "sampling": {{"max_tokens": 400}}}}"#).unwrap();

        let config = Config::load(file.path(), true).unwrap();

        assert_eq!(config.default_model, "openai/gpt-4o-mini");
        assert_eq!(config.sampling.max_tokens, 400);
        assert_eq!(config.sampling.temperature, 0.5);
        assert_eq!(config.base_url, OPENROUTER_BASE_URL);
    }

    #[test]
    fn missing_file_is_an_error_only_when_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        assert!(Config::load(&path, true).is_err());
        let config = Config::load(&path, false).unwrap();
        assert_eq!(config.app_title, "QuantiCure Medical Platform");
    }
}
