use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hiring_pipeline::PipelineConfig;
use serde::Deserialize;

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmEndpoint {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Top-level agent configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub llm: LlmEndpoint,
    pub pipeline: PipelineConfig,
    /// Directory holding the JSON-lines record files.
    pub data_dir: PathBuf,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for AgentConfig {
    fn default() -> Self {
        let defaults = PipelineConfig::default();
        Self {
            llm: LlmEndpoint {
                url: std::env::var("HIRING_LLM_URL")
                    .unwrap_or_else(|_| "https://api.asi1.ai/v1/chat/completions".into()),
                api_key: std::env::var("HIRING_LLM_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty()),
                model: std::env::var("HIRING_LLM_MODEL").unwrap_or_else(|_| "asi1-mini".into()),
                timeout_secs: env_parse("HIRING_LLM_TIMEOUT_SECS", 30),
                temperature: 0.3,
                max_tokens: 800,
            },
            pipeline: PipelineConfig {
                deadline_secs: env_parse("HIRING_DEADLINE_SECS", defaults.deadline_secs),
                breaker_threshold: env_parse("HIRING_BREAKER_THRESHOLD", defaults.breaker_threshold),
            },
            data_dir: std::env::var("HIRING_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }
}

/// Optional overrides read from a TOML file. Every key may be omitted.
///
/// ```toml
/// data_dir = "/var/lib/hiring"
///
/// [llm]
/// url = "http://localhost:8080/v1/chat/completions"
/// model = "qwen2.5-7b-instruct"
/// timeout_secs = 60
///
/// [pipeline]
/// deadline_secs = 300
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub llm: FileLlm,
    #[serde(default)]
    pub pipeline: FilePipeline,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLlm {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilePipeline {
    pub deadline_secs: Option<u64>,
    pub breaker_threshold: Option<u32>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid config file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In {}", path.display()))
    }
}

impl AgentConfig {
    /// Environment defaults, overridden by `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::default();
        match path {
            Some(path) => Ok(config.apply_file(FileConfig::load(path)?)),
            None => Ok(config),
        }
    }

    /// Layer file overrides on top of the environment defaults.
    pub fn apply_file(mut self, file: FileConfig) -> Self {
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        let llm = file.llm;
        if let Some(url) = llm.url {
            self.llm.url = url;
        }
        if llm.api_key.is_some() {
            self.llm.api_key = llm.api_key;
        }
        if let Some(model) = llm.model {
            self.llm.model = model;
        }
        if let Some(secs) = llm.timeout_secs {
            self.llm.timeout_secs = secs;
        }
        if let Some(t) = llm.temperature {
            self.llm.temperature = t;
        }
        if let Some(n) = llm.max_tokens {
            self.llm.max_tokens = n;
        }
        if let Some(secs) = file.pipeline.deadline_secs {
            self.pipeline.deadline_secs = secs;
        }
        if let Some(n) = file.pipeline.breaker_threshold {
            self.pipeline.breaker_threshold = n;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_request_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.llm.max_tokens, 800);
    }

    #[test]
    fn test_file_overrides() {
        let file = FileConfig::parse(
            r#"
            data_dir = "/tmp/hiring"

            [llm]
            model = "local-model"
            timeout_secs = 5

            [pipeline]
            deadline_secs = 10
            "#,
        )
        .unwrap();
        let config = AgentConfig::default().apply_file(file);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/hiring"));
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.timeout_secs, 5);
        assert_eq!(config.pipeline.deadline_secs, 10);
    }

    #[test]
    fn test_empty_file_changes_nothing() {
        let base = AgentConfig::default();
        let config = base.clone().apply_file(FileConfig::parse("").unwrap());
        assert_eq!(config, base);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(FileConfig::parse("[llm]\nmodle = \"typo\"").is_err());
    }
}
