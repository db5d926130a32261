//! Summarization service coordinating segmentation, strategies, and metrics.

use crate::{
    config::Config,
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        adapters::{ChunkSummarizer, ContextSummarizer, FinalSummarizer},
        strategy::{MapReduceStrategy, RefineStrategy, StuffingStrategy},
        types::{
            Document, MapReduceOptions, SplitConfig, Strategy, StrategyOutput, SummarizeError,
            SummaryOutcome,
        },
    },
    summarization::SummarizerSet,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Explicit options the service is constructed with.
#[derive(Debug, Clone, Copy)]
pub struct ServiceOptions {
    /// Chunk boundaries used by refine and map-reduce.
    pub split: SplitConfig,
    /// Map-reduce concurrency and failure policy.
    pub map_reduce: MapReduceOptions,
    /// Optional timeout applied to every individual summarization call.
    pub call_timeout: Option<Duration>,
}

impl ServiceOptions {
    /// Derive validated options from runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, SummarizeError> {
        Ok(Self {
            split: SplitConfig::new(config.chunk_size, config.overlap_size, config.split_unit)?,
            map_reduce: MapReduceOptions {
                max_concurrency: config.max_concurrency,
                failure_policy: config.failure_policy,
            },
            call_timeout: config.call_timeout,
        })
    }
}

/// Runs any of the three strategies over a document with shared adapters and metrics.
///
/// Build the service once and share it through an `Arc`; every run is independent and no state
/// carries over between runs apart from the metrics counters.
pub struct SummarizationService {
    stuffing: StuffingStrategy,
    refine: RefineStrategy,
    map_reduce: MapReduceStrategy,
    split: SplitConfig,
    metrics: Arc<SummaryMetrics>,
}

impl SummarizationService {
    /// Wire the adapters for every strategy from the role-bound capabilities.
    pub fn new(summarizers: SummarizerSet, options: ServiceOptions) -> Result<Self, SummarizeError> {
        let timeout = options.call_timeout;
        let finalizer = FinalSummarizer::new(summarizers.finalize).with_timeout(timeout);
        let map_reduce = MapReduceStrategy::new(
            ChunkSummarizer::new(summarizers.chunk.clone()).with_timeout(timeout),
            finalizer.clone(),
            options.map_reduce,
        )?;
        let refine = RefineStrategy::new(
            ContextSummarizer::new(summarizers.chunk).with_timeout(timeout),
            finalizer,
        );
        let stuffing =
            StuffingStrategy::new(ChunkSummarizer::new(summarizers.stuff).with_timeout(timeout));

        tracing::debug!(
            chunk_size = options.split.chunk_size(),
            overlap = options.split.overlap_size(),
            unit = ?options.split.unit(),
            max_concurrency = options.map_reduce.max_concurrency,
            failure_policy = ?options.map_reduce.failure_policy,
            "Summarization service ready"
        );

        Ok(Self {
            stuffing,
            refine,
            map_reduce,
            split: options.split,
            metrics: Arc::new(SummaryMetrics::new()),
        })
    }

    /// Split configuration used by the chunked strategies.
    pub fn split_config(&self) -> &SplitConfig {
        &self.split
    }

    /// Summarize `document` with `strategy`.
    ///
    /// Cancelling `cancel` aborts every outstanding upstream call and returns
    /// [`SummarizeError::Cancelled`]; nothing from the aborted run is reused.
    pub async fn summarize(
        &self,
        document: &Document,
        strategy: Strategy,
        cancel: &CancellationToken,
    ) -> Result<SummaryOutcome, SummarizeError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "summarize",
            %run_id,
            strategy = strategy.as_str(),
            title = document.metadata.title.as_deref().unwrap_or(""),
        );

        async move {
            tracing::info!(bytes = document.text.len(), "Summarizing document");
            let started = Instant::now();
            let result = match strategy {
                Strategy::Stuff => self.stuffing.run(document, cancel).await,
                Strategy::Refine => self.refine.run(document, &self.split, cancel).await,
                Strategy::MapReduce => self.map_reduce.run(document, &self.split, cancel).await,
            };
            let elapsed = started.elapsed();

            match result {
                Ok(StrategyOutput {
                    summary,
                    chunk_count,
                    upstream_calls,
                    missing_chunks,
                }) => {
                    self.metrics
                        .record_document(chunk_count as u64, upstream_calls as u64);
                    tracing::info!(
                        chunks = chunk_count,
                        missing = missing_chunks.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Document summarized"
                    );
                    Ok(SummaryOutcome {
                        run_id,
                        strategy,
                        summary,
                        chunk_count,
                        missing_chunks,
                        elapsed,
                    })
                }
                Err(error) => {
                    self.metrics.record_failure();
                    tracing::warn!(error = %error, "Summarization failed");
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
