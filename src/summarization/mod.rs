//! The injected summarization capability and its LLM-backed implementations.
//!
//! The processing pipeline only ever sees [`Summarizer`]: a capability with one single-text call
//! shape and one context-aware call shape. [`PromptedSummarizer`] implements it on top of a
//! provider client ([`SummarizationClient`]) by binding one of the three prompt roles. The
//! providers issue HTTP requests directly to the runtime, like the rest of the crate does.

mod ollama;
mod openai;
mod prompted;
pub mod prompts;

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use ollama::OllamaSummarizationClient;
pub use openai::OpenAiSummarizationClient;
pub use prompted::{PromptedSummarizer, RetryPolicy};
pub use prompts::PromptRole;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while attempting abstractive summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with a non-success HTTP status.
    #[error("Failed to generate summary (HTTP {status}): {message}")]
    GenerationFailed {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body or description of the failure.
        message: String,
    },
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl SummarizationClientError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ProviderUnavailable(_) => true,
            Self::GenerationFailed { status, .. } => {
                matches!(*status, 408 | 429) || (500..600).contains(status)
            }
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// System instructions sent ahead of the prompt.
    pub system: String,
    /// Prompt rendered from one of the role templates.
    pub prompt: String,
    /// Maximum number of completion tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by abstractive summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a concise summary using the configured model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// The summarization capability injected into the processing pipeline.
///
/// Implementations must not retry silently beyond their own documented configuration and must
/// not hold state that couples one call to the next.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a standalone piece of text.
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError>;

    /// Summarize `text` while taking the accumulated `context` into account.
    ///
    /// `context` is empty for the first chunk of a document.
    async fn summarize_with_context(
        &self,
        context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError>;
}

/// Capabilities for each prompt role, built from one provider client.
#[derive(Clone)]
pub struct SummarizerSet {
    /// Whole-document summarizer used by the stuffing strategy.
    pub stuff: Arc<dyn Summarizer>,
    /// Per-chunk summarizer used by refine and map-reduce.
    pub chunk: Arc<dyn Summarizer>,
    /// Condenses aggregated partial summaries.
    pub finalize: Arc<dyn Summarizer>,
}

/// Build the provider client described by configuration.
pub fn get_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    match config.summarization_provider {
        SummarizationProvider::OpenAI => {
            let endpoint = config.llm_endpoint.clone().ok_or_else(|| {
                SummarizationClientError::ProviderUnavailable("LLM_ENDPOINT is not set".into())
            })?;
            Ok(Arc::new(OpenAiSummarizationClient::new(
                endpoint,
                config.openai_api_key.clone(),
                config.request_timeout,
            )?))
        }
        SummarizationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Ok(Arc::new(OllamaSummarizationClient::new(
                base_url,
                config.request_timeout,
            )?))
        }
    }
}

/// Build the three role-bound capabilities from configuration.
pub fn build_summarizers(config: &Config) -> Result<SummarizerSet, SummarizationClientError> {
    let client = get_summarization_client(config)?;
    let retry = RetryPolicy::new(config.max_retries);
    let bind = |role: PromptRole| -> Arc<dyn Summarizer> {
        Arc::new(
            PromptedSummarizer::new(client.clone(), config.llm_model.clone(), role)
                .with_max_tokens(config.max_tokens)
                .with_temperature(config.temperature)
                .with_retry(retry),
        )
    };
    tracing::info!(
        provider = ?config.summarization_provider,
        model = %config.llm_model,
        max_retries = config.max_retries,
        "Summarization client initialized"
    );
    Ok(SummarizerSet {
        stuff: bind(PromptRole::Stuff),
        chunk: bind(PromptRole::Chunk),
        finalize: bind(PromptRole::Final),
    })
}
