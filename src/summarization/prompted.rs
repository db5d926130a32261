use super::prompts::{self, PromptRole, SYSTEM_PROMPT};
use super::{SummarizationClient, SummarizationClientError, SummarizationRequest, Summarizer};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// Bounded retry configuration for a [`PromptedSummarizer`].
///
/// Only transient provider errors are retried; the wait grows linearly with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Retry up to `max_retries` times with the default backoff.
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Override the base delay between attempts.
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}

/// [`Summarizer`] that renders a role prompt and forwards it to a provider client.
pub struct PromptedSummarizer {
    client: Arc<dyn SummarizationClient>,
    model: String,
    role: PromptRole,
    max_tokens: u32,
    temperature: f32,
    retry: RetryPolicy,
}

impl PromptedSummarizer {
    /// Bind `role` to `model` on the given provider client.
    pub fn new(client: Arc<dyn SummarizationClient>, model: String, role: PromptRole) -> Self {
        Self {
            client,
            model,
            role,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the completion token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn generate(&self, context: &str, text: &str) -> Result<String, SummarizationClientError> {
        let request = SummarizationRequest {
            model: self.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: prompts::render(self.role, context, text),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut attempt = 0u32;
        loop {
            match self.client.generate_summary(request.clone()).await {
                Ok(summary) => return Ok(summary),
                Err(error) if error.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        role = self.role.as_str(),
                        attempt,
                        max_retries = self.retry.max_retries,
                        error = %error,
                        "Summarization request failed; retrying"
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl Summarizer for PromptedSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        self.generate("", text).await
    }

    async fn summarize_with_context(
        &self,
        context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        self.generate(context, text).await
    }
}
