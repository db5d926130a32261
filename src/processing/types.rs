//! Core data types and error definitions for the summarization pipeline.

use crate::summarization::SummarizationClientError;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while validating split parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Caller configured an impossible chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave at least one new unit per chunk.
    #[error("overlap {overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge {
        /// Configured chunk size.
        chunk_size: usize,
        /// Configured overlap that violated the bound.
        overlap: usize,
    },
}

/// Errors raised when a unit name cannot be parsed.
#[derive(Debug, Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// Failure of a single call to the summarization capability.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The capability reported an error.
    #[error(transparent)]
    Client(#[from] SummarizationClientError),
    /// The call did not complete within the configured timeout.
    #[error("summarization call timed out after {0:?}")]
    Timeout(Duration),
    /// The capability returned blank output for non-blank input.
    #[error("summarization returned empty output")]
    EmptyOutput,
}

/// Pipeline stage an upstream failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Stuffing call over the entire document.
    WholeDocument,
    /// Per-chunk call for the chunk with this index.
    Chunk(usize),
    /// Final condensation of the aggregated context.
    Final,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeDocument => f.write_str("whole document"),
            Self::Chunk(index) => write!(f, "chunk {index}"),
            Self::Final => f.write_str("final summary"),
        }
    }
}

/// Failure recorded for one map-reduce chunk task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Index of the failed chunk.
    pub index: usize,
    /// Rendered error message.
    pub message: String,
}

/// Errors surfaced by the summarization strategies.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Split or strategy options were malformed; no upstream call was made.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// An upstream call failed at the given stage.
    #[error("summarization failed at {stage}: {source}")]
    Upstream {
        /// Stage whose call failed.
        stage: Stage,
        /// Underlying failure.
        #[source]
        source: UpstreamError,
    },
    /// One or more map-reduce chunk tasks failed.
    #[error("{} of {total} chunk summaries failed (indices {failed:?})", .failed.len())]
    PartialBatchFailure {
        /// Failed chunk indices in ascending order.
        failed: Vec<usize>,
        /// Per-chunk failure details in ascending index order.
        failures: Vec<ChunkFailure>,
        /// Number of chunks dispatched.
        total: usize,
    },
    /// The run was cancelled before it completed.
    #[error("summarization cancelled")]
    Cancelled,
}

impl From<ChunkingError> for SummarizeError {
    fn from(error: ChunkingError) -> Self {
        Self::InvalidConfiguration(error.to_string())
    }
}

impl SummarizeError {
    pub(crate) fn upstream(stage: Stage, source: UpstreamError) -> Self {
        Self::Upstream { stage, source }
    }
}

/// Optional descriptive metadata carried alongside the document text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
}

/// Raw text to be summarized. The pipeline only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Full document text.
    pub text: String,
    /// Optional metadata.
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Wrap already-loaded text without metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Contiguous slice of a document produced by the segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in split order, starting at zero.
    pub index: usize,
    /// Chunk text, equal to `document.text[start..end]`.
    pub text: String,
    /// Byte offset of the first character within the document.
    pub start: usize,
    /// Byte offset one past the last character within the document.
    pub end: usize,
}

/// Granularity chunk sizes are counted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitUnit {
    /// Whitespace-delimited words.
    #[default]
    Word,
    /// Sentences per Unicode text segmentation rules.
    Sentence,
    /// Blocks of text separated by blank lines.
    Paragraph,
}

impl std::str::FromStr for SplitUnit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "word" | "words" => Ok(Self::Word),
            "sentence" | "sentences" => Ok(Self::Sentence),
            "paragraph" | "paragraphs" => Ok(Self::Paragraph),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Validated chunk boundaries: `chunk_size > 0` and `overlap_size < chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitConfig {
    chunk_size: usize,
    overlap_size: usize,
    unit: SplitUnit,
}

impl SplitConfig {
    /// Validate split parameters.
    pub fn new(
        chunk_size: usize,
        overlap_size: usize,
        unit: SplitUnit,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if overlap_size >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                chunk_size,
                overlap: overlap_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap_size,
            unit,
        })
    }

    /// Units per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Units shared by adjacent chunks.
    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }

    /// Unit granularity.
    pub fn unit(&self) -> SplitUnit {
        self.unit
    }

    /// Units each window advances by.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap_size
    }
}

/// Output of summarizing one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult {
    /// Index of the summarized chunk.
    pub index: usize,
    /// Summary text.
    pub summary: String,
}

/// How map-reduce reacts when some chunk tasks fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Fail the run with every failed index once all tasks have finished.
    #[default]
    FailFast,
    /// Reduce over the chunks that succeeded and report the gaps.
    BestEffort,
}

impl std::str::FromStr for FailurePolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(Self::FailFast),
            "best-effort" => Ok(Self::BestEffort),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Options for the map-reduce strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapReduceOptions {
    /// Upper bound on chunk tasks in flight.
    pub max_concurrency: usize,
    /// Reaction to failed chunks.
    pub failure_policy: FailurePolicy,
}

impl Default for MapReduceOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

/// Summarization strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Whole document in one call.
    Stuff,
    /// Sequential pass with accumulated context.
    Refine,
    /// Concurrent per-chunk pass followed by ordered reduction.
    #[default]
    MapReduce,
}

impl Strategy {
    /// Short label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stuff => "stuff",
            Self::Refine => "refine",
            Self::MapReduce => "map-reduce",
        }
    }
}

/// Final summary for one strategy run, without service bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOutput {
    /// Final summary text.
    pub summary: String,
    /// Number of chunks the document was split into (zero for stuffing).
    pub chunk_count: usize,
    /// Upstream calls that completed successfully.
    pub upstream_calls: usize,
    /// Chunk indices omitted under [`FailurePolicy::BestEffort`].
    pub missing_chunks: Vec<usize>,
}

/// Result of a summarization run returned by [`crate::processing::SummarizationService`].
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    /// Identifier attached to the run's tracing span.
    pub run_id: Uuid,
    /// Strategy that produced the summary.
    pub strategy: Strategy,
    /// Final summary text.
    pub summary: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Chunk indices omitted under [`FailurePolicy::BestEffort`].
    pub missing_chunks: Vec<usize>,
    /// Wall-clock time spent in the strategy.
    pub elapsed: Duration,
}
