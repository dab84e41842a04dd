use serde_json::{Value, json};

use crate::{
    config::{Config, ConfigError},
    error::{Result, VidbriefError},
    provider::Provider,
    retry::RetryPolicy,
};

pub const SYSTEM_PROMPT: &str = r#"You are a careful, neutral archivist of online video content.

You receive a single text document with these sections:
- TITLE and DESCRIPTION of the video
- TRANSCRIPT, one line per segment formatted as [start -> end] text
- COMMENTS, ranked by like count

Rules:
1. Separate what is shown from what the speaker claims. Attribute opinions
   and performance claims to the speaker ("the creator argues...").
2. Every key insight cites an approximate timestamp as (Time: MM:SS).
3. Read the comments for corrections, disputes and practical tips, not only
   for sentiment.

Answer in Markdown with exactly these sections:

### Video Content Summary
One dense paragraph of 150-250 words.

### Key Insights
- **Concept** (Time: MM:SS): explanation with attribution.

### Detailed Breakdown
A two-column table whose columns suit the content type (for example
Aspect/Details for technology, Step/Action for tutorials, Feature/Verdict for
reviews, Topic/Claim for commentary).

### Community Intelligence
Overall mood with an approximate ratio, positive highlights and criticisms
with approximate like counts, then corrections and tips if there are any.
"#;

/// Chat-completions client for the configured provider.
pub struct Summarizer {
    client: reqwest::Client,
    provider: Provider,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    retry: RetryPolicy,
}

/// Resolve the API key the configured provider needs, failing early when absent.
pub fn required_api_key(config: &Config) -> Result<Option<String>> {
    let provider = config.llm_provider()?;
    match provider.config().env_var {
        None => Ok(None),
        Some(env_var) => config
            .api_key(env_var)
            .map(Some)
            .ok_or_else(|| VidbriefError::MissingApiKey {
                env_var: env_var.to_string(),
            }),
    }
}

impl Summarizer {
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = config.llm_provider()?;
        let url = provider
            .chat_completions_url(config.llm.base_url.as_deref())
            .ok_or_else(|| ConfigError::MissingBaseUrl(provider.id().to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            url,
            model: config.llm.model.clone(),
            api_key: required_api_key(config)?,
            temperature: config.llm.temperature,
            retry: RetryPolicy::from_config(&config.download),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_body(&self, context: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": context },
            ],
            "temperature": self.temperature,
        })
    }

    /// Send the assembled context and return the model's Markdown answer.
    pub async fn summarize(&self, context: &str) -> Result<String> {
        let body = self.request_body(context);
        tracing::info!(
            provider = self.provider.id(),
            model = %self.model,
            url = %self.url,
            "requesting summary"
        );

        let response = self
            .retry
            .execute("summarize", || {
                let mut request = self.client.post(&self.url).json(&body);
                if let Some(key) = &self.api_key {
                    request = request.bearer_auth(key);
                }
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    if !status.is_success() {
                        let text = response.text().await.unwrap_or_default();
                        return Err(VidbriefError::SummaryFailed {
                            reason: format!("HTTP {}: {}", status.as_u16(), text),
                        });
                    }
                    Ok(response.json::<Value>().await?)
                }
            })
            .await?;

        extract_content(&response).ok_or_else(|| VidbriefError::SummaryFailed {
            reason: format!("Invalid API response structure: {response}"),
        })
    }
}

/// `choices[0].message.content` of a chat-completions response.
pub fn extract_content(response: &Value) -> Option<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_choice() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "### Summary" } }]
        });
        assert_eq!(extract_content(&response).as_deref(), Some("### Summary"));
        assert_eq!(extract_content(&json!({ "choices": [] })), None);
        assert_eq!(extract_content(&json!({ "error": "nope" })), None);
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = Config::from_yaml_str(
            "llm:\n  provider: ollama\n  model: llama3.1\n  base_url: http://localhost:11434\n",
        )
        .unwrap();
        assert_eq!(required_api_key(&config).unwrap(), None);

        let summarizer = Summarizer::from_config(&config).unwrap();
        let body = summarizer.request_body("CONTEXT");
        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["messages"][1]["content"], "CONTEXT");
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn configured_key_is_used() {
        let mut config = Config::from_yaml_str("llm:\n  provider: cerebras\n  model: llama3.1-8b\n").unwrap();
        config
            .api_keys
            .insert("CEREBRAS_API_KEY".to_string(), "csk-test".to_string());
        assert_eq!(
            required_api_key(&config).unwrap().as_deref(),
            Some("csk-test")
        );
    }
}
