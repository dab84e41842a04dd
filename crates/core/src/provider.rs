use std::{fmt, str::FromStr};

use crate::config::ConfigError;

/// Chat-completion backends. All of them are reached through an
/// OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Provider {
    #[default]
    Openai,
    Anthropic,
    Gemini,
    Groq,
    Openrouter,
    Cerebras,
    Grok,
    Ollama,
}

pub struct ProviderConfig {
    pub api_url: Option<&'static str>,
    pub default_model: &'static str,
    pub env_var: Option<&'static str>,
}

impl Provider {
    pub const ALL: [Provider; 8] = [
        Provider::Openai,
        Provider::Anthropic,
        Provider::Gemini,
        Provider::Groq,
        Provider::Openrouter,
        Provider::Cerebras,
        Provider::Grok,
        Provider::Ollama,
    ];

    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Openai => ProviderConfig {
                api_url: Some("https://api.openai.com/v1/chat/completions"),
                default_model: "gpt-4o-mini",
                env_var: Some("OPENAI_API_KEY"),
            },
            Provider::Anthropic => ProviderConfig {
                api_url: Some("https://api.anthropic.com/v1/chat/completions"),
                default_model: "claude-sonnet-4-5",
                env_var: Some("ANTHROPIC_API_KEY"),
            },
            Provider::Gemini => ProviderConfig {
                api_url: Some(
                    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                ),
                default_model: "gemini-2.5-flash",
                env_var: Some("GEMINI_API_KEY"),
            },
            Provider::Groq => ProviderConfig {
                api_url: Some("https://api.groq.com/openai/v1/chat/completions"),
                default_model: "llama-3.3-70b-versatile",
                env_var: Some("GROQ_API_KEY"),
            },
            Provider::Openrouter => ProviderConfig {
                api_url: Some("https://openrouter.ai/api/v1/chat/completions"),
                default_model: "openai/gpt-4o-mini",
                env_var: Some("OPENROUTER_API_KEY"),
            },
            Provider::Cerebras => ProviderConfig {
                api_url: Some("https://api.cerebras.ai/v1/chat/completions"),
                default_model: "llama3.1-8b",
                env_var: Some("CEREBRAS_API_KEY"),
            },
            Provider::Grok => ProviderConfig {
                api_url: Some("https://api.x.ai/v1/chat/completions"),
                default_model: "grok-4-fast",
                env_var: Some("XAI_API_KEY"),
            },
            Provider::Ollama => ProviderConfig {
                api_url: None,
                default_model: "llama3.1",
                env_var: None,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Openai => "OpenAI",
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Gemini",
            Provider::Groq => "Groq",
            Provider::Openrouter => "OpenRouter",
            Provider::Cerebras => "Cerebras",
            Provider::Grok => "Grok",
            Provider::Ollama => "Ollama",
        }
    }

    /// Identifier used in configuration and for tokenizer selection.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Openai => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Gemini => "gemini",
            Provider::Groq => "groq",
            Provider::Openrouter => "openrouter",
            Provider::Cerebras => "cerebras",
            Provider::Grok => "grok",
            Provider::Ollama => "ollama",
        }
    }

    pub fn requires_base_url(&self) -> bool {
        self.config().api_url.is_none()
    }

    /// Chat completions endpoint, honoring a configured base URL override.
    pub fn chat_completions_url(&self, base_url: Option<&str>) -> Option<String> {
        match (base_url, self.config().api_url) {
            (Some(base), _) => Some(format!(
                "{}/v1/chat/completions",
                base.trim_end_matches('/').trim_end_matches("/v1")
            )),
            (None, Some(url)) => Some(url.to_string()),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        let needle = match needle.as_str() {
            "claude" => "anthropic",
            "xai" => "grok",
            other => other,
        };
        Provider::ALL
            .into_iter()
            .find(|p| p.id() == needle)
            .ok_or_else(|| ConfigError::UnknownLlmProvider(s.to_string()))
    }
}

/// Speech-to-text backends used when captions are missing or unusable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TranscriptionProvider {
    /// whisper.cpp through `whisper-rs`.
    #[default]
    Local,
    Openai,
    Groq,
}

pub struct TranscriptionApi {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl TranscriptionProvider {
    pub fn api(&self) -> Option<TranscriptionApi> {
        match self {
            TranscriptionProvider::Local => None,
            TranscriptionProvider::Openai => Some(TranscriptionApi {
                api_url: "https://api.openai.com/v1/audio/transcriptions",
                model: "whisper-1",
                env_var: "OPENAI_API_KEY",
            }),
            TranscriptionProvider::Groq => Some(TranscriptionApi {
                api_url: "https://api.groq.com/openai/v1/audio/transcriptions",
                model: "whisper-large-v3",
                env_var: "GROQ_API_KEY",
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranscriptionProvider::Local => "Whisper (local)",
            TranscriptionProvider::Openai => "OpenAI Whisper",
            TranscriptionProvider::Groq => "Groq Whisper",
        }
    }
}

impl FromStr for TranscriptionProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(TranscriptionProvider::Local),
            "openai" => Ok(TranscriptionProvider::Openai),
            "groq" => Ok(TranscriptionProvider::Groq),
            _ => Err(ConfigError::UnknownTranscriptionProvider(s.to_string())),
        }
    }
}
