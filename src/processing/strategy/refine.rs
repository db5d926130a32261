use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::processing::adapters::{ContextSummarizer, FinalSummarizer};
use crate::processing::chunking::split;
use crate::processing::types::{
    Document, SplitConfig, Stage, StrategyOutput, SummarizeError, UpstreamError,
};

/// Sequential refinement: every chunk is summarized with all earlier summaries as context.
///
/// Each step depends on the previous one, so latency is the sum of the per-chunk calls and the
/// output depends on chunk order.
#[derive(Clone)]
pub struct RefineStrategy {
    context: ContextSummarizer,
    finalizer: FinalSummarizer,
}

impl RefineStrategy {
    /// Build the strategy from its two adapters.
    pub fn new(context: ContextSummarizer, finalizer: FinalSummarizer) -> Self {
        Self { context, finalizer }
    }

    /// Summarize `document`, aborting on the first upstream failure.
    pub async fn run(
        &self,
        document: &Document,
        split_config: &SplitConfig,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutput, SummarizeError> {
        let chunks = split(&document.text, split_config);
        if chunks.is_empty() {
            tracing::debug!("Document produced no chunks; skipping refine");
            return Ok(StrategyOutput::default());
        }

        let started = Instant::now();
        let mut context = String::new();
        for chunk in &chunks {
            let partial = cancellable(cancel, self.context.summarize(&context, &chunk.text))
                .await?
                .map_err(|source| SummarizeError::upstream(Stage::Chunk(chunk.index), source))?;
            tracing::debug!(
                index = chunk.index,
                context_len = context.len(),
                "Refined chunk summary"
            );
            if !context.is_empty() {
                context.push('\n');
            }
            context.push_str(&partial);
        }

        let summary = cancellable(cancel, self.finalizer.summarize(&context))
            .await?
            .map_err(|source| SummarizeError::upstream(Stage::Final, source))?;

        tracing::info!(
            chunks = chunks.len(),
            chunk_size = split_config.chunk_size(),
            overlap = split_config.overlap_size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summarization (refine) finished"
        );

        Ok(StrategyOutput {
            summary,
            chunk_count: chunks.len(),
            upstream_calls: chunks.len() + 1,
            missing_chunks: Vec::new(),
        })
    }
}

async fn cancellable<F>(
    cancel: &CancellationToken,
    call: F,
) -> Result<Result<String, UpstreamError>, SummarizeError>
where
    F: std::future::Future<Output = Result<String, UpstreamError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SummarizeError::Cancelled),
        result = call => Ok(result),
    }
}
