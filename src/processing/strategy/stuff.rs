use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::processing::adapters::ChunkSummarizer;
use crate::processing::types::{Document, Stage, StrategyOutput, SummarizeError};

/// Summarizes the whole document in a single call.
///
/// The caller decides whether the document fits the model's input window; nothing is enforced
/// here.
#[derive(Clone)]
pub struct StuffingStrategy {
    summarizer: ChunkSummarizer,
}

impl StuffingStrategy {
    /// Build the strategy over a whole-document summarizer.
    pub fn new(summarizer: ChunkSummarizer) -> Self {
        Self { summarizer }
    }

    /// Summarize `document`. Blank documents produce an empty summary without an upstream call.
    pub async fn run(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutput, SummarizeError> {
        if document.text.trim().is_empty() {
            tracing::debug!("Blank document; skipping stuffing call");
            return Ok(StrategyOutput::default());
        }

        let started = Instant::now();
        let summary = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SummarizeError::Cancelled),
            result = self.summarizer.summarize(&document.text) => {
                result.map_err(|source| SummarizeError::upstream(Stage::WholeDocument, source))?
            }
        };
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summarization (stuffing) finished"
        );

        Ok(StrategyOutput {
            summary,
            chunk_count: 0,
            upstream_calls: 1,
            missing_chunks: Vec::new(),
        })
    }
}
