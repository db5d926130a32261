#![deny(missing_docs)]

//! Core library for Rusty Summaries: summarizing documents too large for one model context.

/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Summarization run metrics.
pub mod metrics;
/// Segmentation and summarization strategies.
pub mod processing;
/// Summarization capability and LLM provider clients.
pub mod summarization;
