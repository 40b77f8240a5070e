use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use zhipu_model::llm::DEFAULT_BASE_URL;
use zhipu_model::ModelSettings;

#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub request: RequestConfig,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Inline key; when empty the key is read from `api_key_env`
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Default sampling settings, overridden per invocation by CLI flags
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RequestConfig {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

fn default_model() -> String {
    "glm-4-flash".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: String::new(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// Apply `MODEL_CHOICE` / `BASE_URL` style overrides from `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("MODEL_CHOICE").filter(|v| !v.is_empty()) {
            self.provider.model = model;
        }
        if let Some(url) = lookup("BASE_URL").filter(|v| !v.is_empty()) {
            self.provider.base_url = url;
        }
    }

    /// Config sampling settings with any CLI values layered on top
    pub fn settings(
        &self,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        top_p: Option<f32>,
    ) -> ModelSettings {
        ModelSettings {
            max_tokens: max_tokens.or(self.request.max_tokens),
            temperature: temperature.or(self.request.temperature),
            top_p: top_p.or(self.request.top_p),
        }
    }
}

impl ProviderConfig {
    pub fn resolve_api_key<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.api_key.is_empty() {
            return Ok(self.api_key.clone());
        }
        lookup(&self.api_key_env)
            .filter(|key| !key.is_empty())
            .with_context(|| {
                format!(
                    "No API key: set provider.api_key or the {} environment variable",
                    self.api_key_env
                )
            })
    }
}

/// Load config from file (or defaults) and apply environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    let content =
        fs::read_to_string(&path).context(format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content).context("Failed to parse TOML config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provider]
model = "glm-4"

[request]
max_tokens = 256
"#
        )
        .unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.provider.model, "glm-4");
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.provider.api_key_env, "LLM_API_KEY");
        assert_eq!(config.provider.timeout_secs, 120);
        assert_eq!(config.request.max_tokens, Some(256));
        assert_eq!(config.request.temperature, None);
    }

    #[test]
    fn test_empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = read_config(file.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider\nmodel = ").unwrap();
        assert!(read_config(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_config(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[("MODEL_CHOICE", "glm-4-plus"), ("BASE_URL", "")]));
        assert_eq!(config.provider.model, "glm-4-plus");
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_api_key_resolution() {
        let mut provider = ProviderConfig::default();
        assert!(provider.resolve_api_key(env(&[])).is_err());
        assert!(provider
            .resolve_api_key(env(&[("LLM_API_KEY", "")]))
            .is_err());
        assert_eq!(
            provider
                .resolve_api_key(env(&[("LLM_API_KEY", "from-env")]))
                .unwrap(),
            "from-env"
        );

        provider.api_key = "inline".to_string();
        assert_eq!(
            provider
                .resolve_api_key(env(&[("LLM_API_KEY", "from-env")]))
                .unwrap(),
            "inline"
        );
    }

    #[test]
    fn test_cli_settings_override_config() {
        let config = Config {
            request: RequestConfig {
                max_tokens: Some(100),
                temperature: Some(0.25),
                top_p: None,
            },
            ..Default::default()
        };
        let settings = config.settings(None, Some(0.5), Some(0.75));
        assert_eq!(settings.max_tokens, Some(100));
        assert_eq!(settings.temperature, Some(0.5));
        assert_eq!(settings.top_p, Some(0.75));
    }
}
