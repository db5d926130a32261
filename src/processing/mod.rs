//! Document summarization pipeline: segmentation, adapters, strategies, and the service façade.

pub mod adapters;
pub mod chunking;
mod service;
pub mod strategy;
pub mod types;

pub use adapters::{ChunkSummarizer, ContextSummarizer, FinalSummarizer};
pub use chunking::{split, split_text};
pub use service::{ServiceOptions, SummarizationService};
pub use strategy::{MapReduceStrategy, RefineStrategy, StuffingStrategy, aggregate_context};
pub use types::{
    Chunk, ChunkFailure, ChunkingError, Document, DocumentMetadata, FailurePolicy,
    MapReduceOptions, PartialResult, SplitConfig, SplitUnit, Stage, Strategy, StrategyOutput,
    SummarizeError, SummaryOutcome, UnknownVariant, UpstreamError,
};
