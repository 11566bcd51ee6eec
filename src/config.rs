use std::env;
use std::path::PathBuf;

use tracing::warn;
use url::Url;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("Invalid GEMINI_BASE_URL '{value}': {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub render_dir: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: Url,
    pub gemini_image_model: String,
    pub gemini_text_model: String,
    pub enrich_generations: bool,
}

fn env_bool(source: &dyn Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match source(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            other => {
                warn!("Unknown {} value '{}', using {}", name, other, default);
                default
            }
        },
        None => default,
    }
}

fn env_string(source: &dyn Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    source(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_secret(source: &dyn Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| source(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn normalize_base_url(value: &str) -> Result<Url, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    Url::parse(trimmed).map_err(|source| ConfigError::InvalidBaseUrl {
        value: value.to_string(),
        source,
    })
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(&|name| env::var(name).ok())
    }

    pub fn from_source(source: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let gemini_base_url = normalize_base_url(&env_string(
            source,
            "GEMINI_BASE_URL",
            DEFAULT_GEMINI_BASE_URL,
        ))?;

        Ok(Config {
            log_level: env_string(source, "LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string(source, "LOG_DIR", "logs")),
            render_dir: PathBuf::from(env_string(source, "RENDER_DIR", "renders")),
            gemini_api_key: env_secret(source, &["GEMINI_API_KEY", "API_KEY"]),
            gemini_base_url,
            gemini_image_model: env_string(source, "GEMINI_IMAGE_MODEL", "imagen-4.0-generate-001"),
            gemini_text_model: env_string(source, "GEMINI_TEXT_MODEL", "gemini-2.5-flash"),
            enrich_generations: env_bool(source, "ENRICH_GENERATIONS", true),
        })
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_source(&move |name| values.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.gemini_image_model, "imagen-4.0-generate-001");
        assert_eq!(config.gemini_text_model, "gemini-2.5-flash");
        assert_eq!(config.log_level, "info");
        assert!(config.enrich_generations);
        assert_eq!(config.gemini_base_url.as_str(), DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn legacy_api_key_name_is_accepted() {
        let config = config_from(&[("API_KEY", "secret")]).unwrap();
        assert_eq!(config.require_api_key().unwrap(), "secret");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = config_from(&[("GEMINI_BASE_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn enrichment_can_be_disabled() {
        let config = config_from(&[("ENRICH_GENERATIONS", "false")]).unwrap();
        assert!(!config.enrich_generations);
    }
}
