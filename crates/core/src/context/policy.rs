use crate::config::ConfigError;

/// How a context budget is split between sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetPolicy {
    max_tokens: usize,
    min_comments: usize,
    token_buffer: usize,
    provider: String,
    model: String,
}

impl BudgetPolicy {
    /// Rejects a non-positive `max_tokens` before any work starts.
    pub fn new(
        max_tokens: i64,
        min_comments: usize,
        token_buffer: usize,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        if max_tokens <= 0 {
            return Err(ConfigError::InvalidMaxTokens(max_tokens));
        }
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        Ok(Self {
            max_tokens: max_tokens as usize,
            min_comments,
            token_buffer,
            provider: provider.into(),
            model,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn min_comments(&self) -> usize {
        self.min_comments
    }

    pub fn token_buffer(&self) -> usize {
        self.token_buffer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
