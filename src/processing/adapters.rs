//! Single-call adapters over the injected [`Summarizer`] capability.
//!
//! Each adapter performs exactly one upstream call, applies the optional per-call timeout, and
//! rejects blank output for non-blank input. None of them retry; retries are configuration of
//! the capability itself.

use crate::summarization::{SummarizationClientError, Summarizer};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::UpstreamError;

/// Summarizes one standalone text (a chunk, or a whole document when stuffing).
#[derive(Clone)]
pub struct ChunkSummarizer {
    inner: Arc<dyn Summarizer>,
    call_timeout: Option<Duration>,
}

/// Summarizes one chunk given the accumulated context of earlier chunks.
#[derive(Clone)]
pub struct ContextSummarizer {
    inner: Arc<dyn Summarizer>,
    call_timeout: Option<Duration>,
}

/// Condenses the aggregated partial summaries into the final summary.
#[derive(Clone)]
pub struct FinalSummarizer {
    inner: Arc<dyn Summarizer>,
    call_timeout: Option<Duration>,
}

impl ChunkSummarizer {
    /// Wrap a capability.
    pub fn new(inner: Arc<dyn Summarizer>) -> Self {
        Self {
            inner,
            call_timeout: None,
        }
    }

    /// Bound every call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Summarize `text`.
    pub async fn summarize(&self, text: &str) -> Result<String, UpstreamError> {
        guarded_call("chunk", text, self.call_timeout, self.inner.summarize(text)).await
    }
}

impl ContextSummarizer {
    /// Wrap a capability.
    pub fn new(inner: Arc<dyn Summarizer>) -> Self {
        Self {
            inner,
            call_timeout: None,
        }
    }

    /// Bound every call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Summarize `text` in light of `context`, which may be empty.
    pub async fn summarize(&self, context: &str, text: &str) -> Result<String, UpstreamError> {
        guarded_call(
            "context",
            text,
            self.call_timeout,
            self.inner.summarize_with_context(context, text),
        )
        .await
    }
}

impl FinalSummarizer {
    /// Wrap a capability.
    pub fn new(inner: Arc<dyn Summarizer>) -> Self {
        Self {
            inner,
            call_timeout: None,
        }
    }

    /// Bound every call by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Condense the aggregated context.
    pub async fn summarize(&self, aggregated: &str) -> Result<String, UpstreamError> {
        guarded_call(
            "final",
            aggregated,
            self.call_timeout,
            self.inner.summarize(aggregated),
        )
        .await
    }
}

async fn guarded_call<F>(
    kind: &'static str,
    input: &str,
    call_timeout: Option<Duration>,
    call: F,
) -> Result<String, UpstreamError>
where
    F: Future<Output = Result<String, SummarizationClientError>>,
{
    let started = Instant::now();
    let output = match call_timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| UpstreamError::Timeout(limit))??,
        None => call.await?,
    };
    tracing::debug!(
        kind,
        input_len = input.len(),
        output_len = output.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Summarization call finished"
    );

    if output.trim().is_empty() && !input.trim().is_empty() {
        return Err(UpstreamError::EmptyOutput);
    }
    Ok(output)
}
