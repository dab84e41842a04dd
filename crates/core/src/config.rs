use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    context::BudgetPolicy,
    provider::{Provider, TranscriptionProvider},
};

pub const DEFAULT_CONFIG_FILE: &str = "vidbrief.yaml";
pub const ENV_PREFIX: &str = "VIDBRIEF_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("max_tokens must be a positive integer, got {0}")]
    InvalidMaxTokens(i64),

    #[error("Unknown LLM provider: {0}. Supported: openai, anthropic, gemini, groq, openrouter, cerebras, grok, ollama")]
    UnknownLlmProvider(String),

    #[error("Unknown transcription provider: {0}. Supported: local, openai, groq")]
    UnknownTranscriptionProvider(String),

    #[error("llm.model must not be empty")]
    EmptyModel,

    #[error("llm.base_url must be set when using the {0} provider")]
    MissingBaseUrl(String),

    #[error("transcription.whisper_model must be set when using local transcription")]
    MissingWhisperModel,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("download.max_retries must be at least 1")]
    InvalidMaxRetries,

    #[error("Config file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub provider: String,
    /// ggml model file name, fetched into the cache on first use.
    pub whisper_model: String,
    pub language: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            whisper_model: "ggml-base.en.bin".to_string(),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub max_tokens: i64,
    pub min_comments: usize,
    pub token_buffer: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 65_536,
            min_comments: 25,
            token_buffer: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub timeout_secs: u64,
    pub sub_lang: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1_000,
            timeout_secs: 300,
            sub_lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Which cached artifacts outlive a processed video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    /// Drop the whole cache directory once the summary is written.
    None,
    /// Keep info JSON, captions and transcript; drop audio after transcription.
    #[default]
    Meta,
    /// Keep the downloaded audio; drop metadata, captions and transcript.
    Media,
    All,
}

impl SaveMode {
    pub fn keeps_media(&self) -> bool {
        matches!(self, SaveMode::Media | SaveMode::All)
    }

    pub fn keeps_metadata(&self) -> bool {
        matches!(self, SaveMode::Meta | SaveMode::All)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub transcription: TranscriptionConfig,
    pub context: ContextConfig,
    pub download: DownloadConfig,
    pub logging: LogConfig,
    /// Keys by environment variable name; consulted before the process environment.
    pub api_keys: BTreeMap<String, String>,
    pub output_dir: Option<PathBuf>,
    pub save: SaveMode,
}

impl Config {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `path`, or `vidbrief.yaml` in the working directory when absent
    /// 3. Environment variables (`VIDBRIEF_` prefix, `__` for nesting)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::MissingFile(p.to_path_buf())),
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: Config = Self::figment()
            .merge(Yaml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = Self::figment().merge(Yaml::string(yaml)).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let provider = self.llm_provider()?;
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if provider.requires_base_url() && self.llm.base_url.is_none() {
            return Err(ConfigError::MissingBaseUrl(provider.id().to_string()));
        }

        let transcription = self.transcription_provider()?;
        if transcription == TranscriptionProvider::Local
            && self.transcription.whisper_model.trim().is_empty()
        {
            return Err(ConfigError::MissingWhisperModel);
        }

        self.budget_policy()?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        if self.download.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries);
        }

        Ok(())
    }

    pub fn llm_provider(&self) -> Result<Provider, ConfigError> {
        self.llm.provider.parse()
    }

    pub fn transcription_provider(&self) -> Result<TranscriptionProvider, ConfigError> {
        self.transcription.provider.parse()
    }

    pub fn budget_policy(&self) -> Result<BudgetPolicy, ConfigError> {
        BudgetPolicy::new(
            self.context.max_tokens,
            self.context.min_comments,
            self.context.token_buffer,
            &self.llm.provider,
            &self.llm.model,
        )
    }

    /// Resolve an API key from `api_keys`, then the environment.
    pub fn api_key(&self, env_var: &str) -> Option<String> {
        self.api_keys
            .get(env_var)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .or_else(|| std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()))
    }
}
