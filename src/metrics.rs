use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    documents_summarized: AtomicU64,
    chunks_summarized: AtomicU64,
    upstream_calls: AtomicU64,
    failed_runs: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run, the chunks it produced, and the upstream calls it made.
    pub fn record_document(&self, chunk_count: u64, upstream_calls: u64) {
        self.documents_summarized.fetch_add(1, Ordering::Relaxed);
        self.chunks_summarized
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.upstream_calls
            .fetch_add(upstream_calls, Ordering::Relaxed);
    }

    /// Record a run that ended in an error or was cancelled.
    pub fn record_failure(&self) {
        self.failed_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_summarized: self.documents_summarized.load(Ordering::Relaxed),
            chunks_summarized: self.chunks_summarized.load(Ordering::Relaxed),
            upstream_calls: self.upstream_calls.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents summarized successfully since startup.
    pub documents_summarized: u64,
    /// Total chunk count produced across all successful runs.
    pub chunks_summarized: u64,
    /// Upstream summarization calls issued by successful runs.
    pub upstream_calls: u64,
    /// Runs that failed or were cancelled.
    pub failed_runs: u64,
}
