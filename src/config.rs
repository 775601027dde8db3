//! Runtime settings, read once at startup.
//!
//! Values come from a [`SecretSource`]. The binary uses the process
//! environment (after loading a `.env` file when present), tests use a map.

use crate::error::ConfigurationError;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str =
    "You are a professional digital product creator and copywriter.";

/// Read-only key lookup.
pub trait SecretSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
pub struct EnvSecrets;

impl EnvSecrets {
    /// Loads `.env` into the environment if one exists.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded settings from {}", path.display());
        }
        EnvSecrets
    }
}

impl SecretSource for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl SecretSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub default_chapters: usize,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub system_instruction: String,
    pub ad_hook_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_chapters: 5,
            temperature: 0.7,
            max_output_tokens: 2500,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            ad_hook_count: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub bind_addr: String,
}

impl Config {
    pub fn from_source(source: &dyn SecretSource) -> Result<Self, ConfigurationError> {
        // GROQ_API_KEY is accepted as an alias for hosted Groq deployments
        let api_key = source
            .get("LLM_API_KEY")
            .or_else(|| source.get("GROQ_API_KEY"))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigurationError::Missing("LLM_API_KEY"))?;

        let defaults = PipelineConfig::default();
        let llm = LlmConfig {
            api_key,
            api_url: source
                .get("LLM_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model: source
                .get("LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(parse_or(source, "LLM_TIMEOUT_SECS", 120)?),
        };

        let pipeline = PipelineConfig {
            default_chapters: parse_or(source, "AUTOBOOK_CHAPTERS", defaults.default_chapters)?,
            temperature: parse_or(source, "LLM_TEMPERATURE", defaults.temperature)?,
            max_output_tokens: parse_or(source, "LLM_MAX_TOKENS", defaults.max_output_tokens)?,
            system_instruction: source
                .get("LLM_SYSTEM_INSTRUCTION")
                .unwrap_or(defaults.system_instruction),
            ad_hook_count: parse_or(source, "AUTOBOOK_AD_HOOKS", defaults.ad_hook_count)?,
        };

        if !(1..=crate::services::pipeline::MAX_CHAPTERS).contains(&pipeline.default_chapters) {
            return Err(ConfigurationError::Invalid {
                key: "AUTOBOOK_CHAPTERS",
                message: format!(
                    "must be between 1 and {}",
                    crate::services::pipeline::MAX_CHAPTERS
                ),
            });
        }
        if !(0.0..=2.0).contains(&pipeline.temperature) {
            return Err(ConfigurationError::Invalid {
                key: "LLM_TEMPERATURE",
                message: "must be between 0.0 and 2.0".to_string(),
            });
        }

        Ok(Config {
            llm,
            pipeline,
            bind_addr: source
                .get("BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }
}

fn parse_or<T: FromStr>(
    source: &dyn SecretSource,
    key: &'static str,
    default: T,
) -> Result<T, ConfigurationError>
where
    T::Err: std::fmt::Display,
{
    match source.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigurationError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = Config::from_source(&source(&[])).unwrap_err();
        assert!(matches!(err, ConfigurationError::Missing("LLM_API_KEY")));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = Config::from_source(&source(&[("LLM_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigurationError::Missing(_)));
    }

    #[test]
    fn groq_key_alias_and_defaults() {
        let config = Config::from_source(&source(&[("GROQ_API_KEY", "gsk_test")])).unwrap();
        assert_eq!(config.llm.api_key, "gsk_test");
        assert_eq!(config.llm.api_url, DEFAULT_API_URL);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.pipeline.default_chapters, 5);
        assert_eq!(config.pipeline.max_output_tokens, 2500);
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = Config::from_source(&source(&[
            ("LLM_API_KEY", "k"),
            ("LLM_MAX_TOKENS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { key: "LLM_MAX_TOKENS", .. }));
    }

    #[test]
    fn rejects_out_of_range_chapter_default() {
        let err = Config::from_source(&source(&[
            ("LLM_API_KEY", "k"),
            ("AUTOBOOK_CHAPTERS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { key: "AUTOBOOK_CHAPTERS", .. }));
    }
}
