use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::aggregate_context;
use crate::processing::adapters::{ChunkSummarizer, FinalSummarizer};
use crate::processing::chunking::split;
use crate::processing::types::{
    Chunk, ChunkFailure, Document, FailurePolicy, MapReduceOptions, PartialResult, SplitConfig,
    Stage, StrategyOutput, SummarizeError,
};

/// Concurrent per-chunk summarization followed by an order-restoring reduce.
///
/// Tasks are dispatched in ascending chunk index, at most `max_concurrency` at a time, and may
/// finish in any order. The reduce step keys every partial summary by its chunk index, so the
/// aggregated context (and therefore the final summary for a deterministic capability) never
/// depends on completion order.
#[derive(Clone)]
pub struct MapReduceStrategy {
    summarizer: ChunkSummarizer,
    finalizer: FinalSummarizer,
    options: MapReduceOptions,
}

/// Outcome of the map phase: one slot per successful chunk plus every failure.
struct MapOutput {
    partials: Vec<PartialResult>,
    failures: Vec<ChunkFailure>,
}

impl MapReduceStrategy {
    /// Build the strategy.
    ///
    /// `max_concurrency` must lie in `1..=Semaphore::MAX_PERMITS`.
    pub fn new(
        summarizer: ChunkSummarizer,
        finalizer: FinalSummarizer,
        options: MapReduceOptions,
    ) -> Result<Self, SummarizeError> {
        if options.max_concurrency == 0 {
            return Err(SummarizeError::InvalidConfiguration(
                "map-reduce max concurrency must be greater than zero".into(),
            ));
        }
        if options.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(SummarizeError::InvalidConfiguration(format!(
                "map-reduce max concurrency {} exceeds the limit of {}",
                options.max_concurrency,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(Self {
            summarizer,
            finalizer,
            options,
        })
    }

    /// Summarize `document`.
    ///
    /// Under [`FailurePolicy::FailFast`] any failed chunk fails the run with
    /// [`SummarizeError::PartialBatchFailure`] once every task has finished. Under
    /// [`FailurePolicy::BestEffort`] the reduce runs over the chunks that succeeded and the gaps
    /// are returned in [`StrategyOutput::missing_chunks`]; a run where every chunk failed is
    /// still an error. A document without chunks yields an empty summary and no upstream call.
    pub async fn run(
        &self,
        document: &Document,
        split_config: &SplitConfig,
        cancel: &CancellationToken,
    ) -> Result<StrategyOutput, SummarizeError> {
        let chunks = split(&document.text, split_config);
        let total = chunks.len();
        if total == 0 {
            tracing::debug!("Document produced no chunks; skipping map-reduce");
            return Ok(StrategyOutput::default());
        }

        let started = Instant::now();
        let MapOutput { partials, failures } = self.map(chunks, cancel).await?;

        let missing_chunks: Vec<usize> = failures.iter().map(|failure| failure.index).collect();
        if !failures.is_empty() {
            let fail_run = match self.options.failure_policy {
                FailurePolicy::FailFast => true,
                FailurePolicy::BestEffort => partials.is_empty(),
            };
            if fail_run {
                return Err(SummarizeError::PartialBatchFailure {
                    failed: missing_chunks,
                    failures,
                    total,
                });
            }
            tracing::warn!(
                missing = ?missing_chunks,
                total,
                "Reducing over partial results; failed chunks omitted"
            );
        }

        let succeeded = partials.len();
        let aggregated = aggregate_context(partials);
        let summary = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SummarizeError::Cancelled),
            result = self.finalizer.summarize(&aggregated) => {
                result.map_err(|source| SummarizeError::upstream(Stage::Final, source))?
            }
        };

        tracing::info!(
            chunks = total,
            chunk_size = split_config.chunk_size(),
            overlap = split_config.overlap_size(),
            max_concurrency = self.options.max_concurrency,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Summarization (map-reduce) finished"
        );

        Ok(StrategyOutput {
            summary,
            chunk_count: total,
            upstream_calls: succeeded + 1,
            missing_chunks,
        })
    }

    async fn map(
        &self,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<MapOutput, SummarizeError> {
        let permits = Arc::new(Semaphore::new(self.options.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut task_chunks = HashMap::with_capacity(chunks.len());

        // Permits are taken here rather than inside the task so dispatch follows index order.
        for chunk in chunks {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(SummarizeError::Cancelled);
                }
                permit = permits.clone().acquire_owned() => {
                    // The semaphore is never closed.
                    permit.map_err(|_| SummarizeError::Cancelled)?
                }
            };
            let summarizer = self.summarizer.clone();
            let index = chunk.index;
            let handle = tasks.spawn(async move {
                let _permit = permit;
                (chunk.index, summarizer.summarize(&chunk.text).await)
            });
            task_chunks.insert(handle.id(), index);
        }

        let mut slots: BTreeMap<usize, String> = BTreeMap::new();
        let mut failures = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(SummarizeError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else { break };

            match joined {
                Ok((index, Ok(summary))) => {
                    tracing::debug!(index, "Chunk summary completed");
                    let previous = slots.insert(index, summary);
                    debug_assert!(previous.is_none(), "chunk {index} summarized twice");
                }
                Ok((index, Err(error))) => {
                    tracing::warn!(index, error = %error, "Chunk summary failed");
                    failures.push(ChunkFailure {
                        index,
                        message: error.to_string(),
                    });
                }
                Err(join_error) => {
                    let Some(&index) = task_chunks.get(&join_error.id()) else {
                        continue;
                    };
                    tracing::error!(index, error = %join_error, "Chunk summary task aborted");
                    failures.push(ChunkFailure {
                        index,
                        message: join_error.to_string(),
                    });
                }
            }
        }

        failures.sort_by_key(|failure| failure.index);
        Ok(MapOutput {
            partials: slots
                .into_iter()
                .map(|(index, summary)| PartialResult { index, summary })
                .collect(),
            failures,
        })
    }
}
