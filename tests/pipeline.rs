use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use rustysum::processing::{
    ChunkSummarizer, ContextSummarizer, Document, FailurePolicy, FinalSummarizer,
    MapReduceOptions, MapReduceStrategy, PartialResult, RefineStrategy, SplitConfig, SplitUnit,
    Stage, StuffingStrategy, SummarizeError, UpstreamError, aggregate_context,
};
use rustysum::summarization::{SummarizationClientError, Summarizer};
use tokio_util::sync::CancellationToken;

/// Deterministic stub: `"{prefix}{text}"`, or `"{prefix}[{context}]{text}"` with context.
///
/// Fails whenever the text contains `fail_marker`, and records every call.
struct Stub {
    prefix: &'static str,
    fail_marker: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl Stub {
    fn new(prefix: &'static str) -> Arc<Self> {
        Arc::new(Self {
            prefix,
            fail_marker: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing_on(prefix: &'static str, marker: &'static str) -> Arc<Self> {
        Arc::new(Self {
            prefix,
            fail_marker: Some(marker),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, text: &str) -> Result<(), SummarizationClientError> {
        self.calls.lock().unwrap().push(text.to_string());
        match self.fail_marker {
            Some(marker) if text.contains(marker) => {
                Err(SummarizationClientError::GenerationFailed {
                    status: 500,
                    message: format!("refusing {text}"),
                })
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Summarizer for Stub {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        self.check(text)?;
        Ok(format!("{}{text}", self.prefix))
    }

    async fn summarize_with_context(
        &self,
        context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        self.check(text)?;
        Ok(format!("{}[{context}]{text}", self.prefix))
    }
}

/// Later chunks finish first: word `wN` sleeps `(10 - N) * 10ms`.
#[derive(Default)]
struct Staggered {
    completed: Mutex<Vec<String>>,
}

#[async_trait]
impl Summarizer for Staggered {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        let n: u64 = text.trim_start_matches('w').parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis((10 - n.min(10)) * 10)).await;
        self.completed.lock().unwrap().push(text.to_string());
        Ok(format!("S:{text}"))
    }

    async fn summarize_with_context(
        &self,
        _context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        self.summarize(text).await
    }
}

/// Never completes; counts how many calls started and how many futures were dropped.
#[derive(Default)]
struct Hanging {
    started: AtomicUsize,
    dropped: Arc<AtomicUsize>,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Summarizer for Hanging {
    async fn summarize(&self, _text: &str) -> Result<String, SummarizationClientError> {
        let _guard = DropCounter(self.dropped.clone());
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn summarize_with_context(
        &self,
        _context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        self.summarize(text).await
    }
}

/// Panics on any text containing `marker`; echoes everything else.
struct Panicking {
    marker: &'static str,
}

#[async_trait]
impl Summarizer for Panicking {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        if text.contains(self.marker) {
            panic!("cannot summarize {text}");
        }
        Ok(format!("S:{text}"))
    }

    async fn summarize_with_context(
        &self,
        _context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        self.summarize(text).await
    }
}

/// Sleeps `delay` before answering any text containing `marker`.
struct Slow {
    marker: &'static str,
    delay: Duration,
}

#[async_trait]
impl Summarizer for Slow {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationClientError> {
        if text.contains(self.marker) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!("S:{text}"))
    }

    async fn summarize_with_context(
        &self,
        _context: &str,
        text: &str,
    ) -> Result<String, SummarizationClientError> {
        self.summarize(text).await
    }
}

fn map_reduce(
    chunk: Arc<dyn Summarizer>,
    finalize: Arc<dyn Summarizer>,
    max_concurrency: usize,
    failure_policy: FailurePolicy,
) -> MapReduceStrategy {
    MapReduceStrategy::new(
        ChunkSummarizer::new(chunk),
        FinalSummarizer::new(finalize),
        MapReduceOptions {
            max_concurrency,
            failure_policy,
        },
    )
    .expect("valid options")
}

fn words(count: usize) -> Document {
    Document::new(
        (0..count)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn one_word_chunks() -> SplitConfig {
    SplitConfig::new(1, 0, SplitUnit::Word).unwrap()
}

#[tokio::test]
async fn map_reduce_matches_the_worked_example() {
    let strategy = map_reduce(Stub::new("S:"), Stub::new("F:"), 4, FailurePolicy::FailFast);
    let config = SplitConfig::new(2, 0, SplitUnit::Sentence).unwrap();

    let output = strategy
        .run(&Document::new("A. B. C. D."), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.summary, "F:S:A. B.\nS:C. D.");
    assert_eq!(output.chunk_count, 2);
    assert!(output.missing_chunks.is_empty());
}

#[tokio::test(start_paused = true)]
async fn map_reduce_output_ignores_completion_order() {
    let staggered = Arc::new(Staggered::default());
    let finalizer = Stub::new("F:");
    let strategy = map_reduce(
        staggered.clone(),
        finalizer.clone(),
        10,
        FailurePolicy::FailFast,
    );

    let output = strategy
        .run(&words(5), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap();

    let completed = staggered.completed.lock().unwrap().clone();
    assert_eq!(completed, vec!["w4", "w3", "w2", "w1", "w0"]);
    assert_eq!(finalizer.calls(), vec!["S:w0\nS:w1\nS:w2\nS:w3\nS:w4"]);
    assert_eq!(output.summary, "F:S:w0\nS:w1\nS:w2\nS:w3\nS:w4");
}

#[test]
fn aggregation_is_identical_for_every_completion_order() {
    let partials: Vec<PartialResult> = (0..4)
        .map(|index| PartialResult {
            index,
            summary: format!("s{index}"),
        })
        .collect();
    let expected = aggregate_context(partials.clone());

    let orders = [[3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1], [0, 1, 2, 3]];
    for order in orders {
        let permuted = order.iter().map(|&i| partials[i].clone());
        assert_eq!(aggregate_context(permuted), expected);
    }
    assert_eq!(expected, "s0\ns1\ns2\ns3");
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let strategy = map_reduce(Stub::new("S:"), Stub::new("F:"), 2, FailurePolicy::FailFast);
    let config = SplitConfig::new(3, 1, SplitUnit::Word).unwrap();
    let document = words(11);
    let cancel = CancellationToken::new();

    let first = strategy.run(&document, &config, &cancel).await.unwrap();
    let second = strategy.run(&document, &config, &cancel).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn failed_chunk_fails_the_batch_by_default() {
    let chunk = Stub::failing_on("S:", "w2");
    let finalizer = Stub::new("F:");
    let strategy = map_reduce(chunk.clone(), finalizer.clone(), 2, FailurePolicy::FailFast);

    let error = strategy
        .run(&words(5), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        SummarizeError::PartialBatchFailure {
            failed,
            failures,
            total,
        } => {
            assert_eq!(failed, vec![2]);
            assert_eq!(failures[0].index, 2);
            assert!(failures[0].message.contains("refusing w2"));
            assert_eq!(total, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Siblings still ran to completion; the reduce never started.
    assert_eq!(chunk.calls().len(), 5);
    assert!(finalizer.calls().is_empty());
}

#[tokio::test]
async fn best_effort_reduces_over_successes_and_reports_gaps() {
    let strategy = map_reduce(
        Stub::failing_on("S:", "w2"),
        Stub::new("F:"),
        2,
        FailurePolicy::BestEffort,
    );

    let output = strategy
        .run(&words(5), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.summary, "F:S:w0\nS:w1\nS:w3\nS:w4");
    assert_eq!(output.missing_chunks, vec![2]);
}

#[tokio::test]
async fn best_effort_still_fails_when_nothing_succeeded() {
    let strategy = map_reduce(
        Stub::failing_on("S:", "w"),
        Stub::new("F:"),
        2,
        FailurePolicy::BestEffort,
    );

    let error = strategy
        .run(&words(3), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(
        matches!(error, SummarizeError::PartialBatchFailure { ref failed, .. } if failed == &vec![0, 1, 2])
    );
}

#[tokio::test]
async fn final_failure_is_attributed_to_the_final_stage() {
    let strategy = map_reduce(
        Stub::new("S:"),
        Stub::failing_on("F:", "S:"),
        2,
        FailurePolicy::FailFast,
    );

    let error = strategy
        .run(&words(2), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SummarizeError::Upstream {
            stage: Stage::Final,
            source: UpstreamError::Client(_)
        }
    ));
}

#[tokio::test]
async fn empty_document_short_circuits_every_strategy() {
    let chunk = Stub::new("S:");
    let finalizer = Stub::new("F:");
    let cancel = CancellationToken::new();
    let config = SplitConfig::new(4, 1, SplitUnit::Word).unwrap();
    let blank = Document::new("  \n ");

    let mapped = map_reduce(chunk.clone(), finalizer.clone(), 2, FailurePolicy::FailFast)
        .run(&blank, &config, &cancel)
        .await
        .unwrap();
    let refined = RefineStrategy::new(
        ContextSummarizer::new(chunk.clone()),
        FinalSummarizer::new(finalizer.clone()),
    )
    .run(&blank, &config, &cancel)
    .await
    .unwrap();
    let stuffed = StuffingStrategy::new(ChunkSummarizer::new(chunk.clone()))
        .run(&blank, &cancel)
        .await
        .unwrap();

    for output in [mapped, refined, stuffed] {
        assert_eq!(output.summary, "");
        assert_eq!(output.chunk_count, 0);
    }
    assert!(chunk.calls().is_empty());
    assert!(finalizer.calls().is_empty());
}

#[tokio::test]
async fn refine_passes_accumulated_context_in_order() {
    let chunk = Stub::new("S:");
    let finalizer = Stub::new("F:");
    let strategy = RefineStrategy::new(
        ContextSummarizer::new(chunk.clone()),
        FinalSummarizer::new(finalizer.clone()),
    );
    let config = SplitConfig::new(2, 0, SplitUnit::Sentence).unwrap();

    let output = strategy
        .run(&Document::new("A. B. C. D."), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(chunk.calls(), vec!["A. B.", "C. D."]);
    assert_eq!(
        finalizer.calls(),
        vec!["S:[]A. B.\nS:[S:[]A. B.]C. D."]
    );
    assert_eq!(output.summary, "F:S:[]A. B.\nS:[S:[]A. B.]C. D.");
}

#[tokio::test]
async fn refine_output_depends_on_chunk_order() {
    let strategy = RefineStrategy::new(
        ContextSummarizer::new(Stub::new("S:")),
        FinalSummarizer::new(Stub::new("F:")),
    );
    let config = one_word_chunks();
    let cancel = CancellationToken::new();

    let forward = strategy
        .run(&Document::new("x y"), &config, &cancel)
        .await
        .unwrap();
    let reversed = strategy
        .run(&Document::new("y x"), &config, &cancel)
        .await
        .unwrap();
    assert_ne!(forward.summary, reversed.summary);
}

#[tokio::test]
async fn single_chunk_refine_uses_empty_context() {
    let chunk = Stub::new("S:");
    let strategy = RefineStrategy::new(
        ContextSummarizer::new(chunk.clone()),
        FinalSummarizer::new(Stub::new("F:")),
    );
    let config = SplitConfig::new(10, 0, SplitUnit::Word).unwrap();

    let output = strategy
        .run(&Document::new("only chunk"), &config, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(output.summary, "F:S:[]only chunk");
    assert_eq!(output.upstream_calls, 2);
}

#[tokio::test]
async fn refine_failure_reports_the_chunk_index() {
    let strategy = RefineStrategy::new(
        ContextSummarizer::new(Stub::failing_on("S:", "w1")),
        FinalSummarizer::new(Stub::new("F:")),
    );

    let error = strategy
        .run(&words(3), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SummarizeError::Upstream {
            stage: Stage::Chunk(1),
            ..
        }
    ));
}

#[tokio::test]
async fn stuffing_failure_is_whole_document() {
    let strategy = StuffingStrategy::new(ChunkSummarizer::new(Stub::failing_on("W:", "book")));

    let error = strategy
        .run(&Document::new("the whole book"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SummarizeError::Upstream {
            stage: Stage::WholeDocument,
            ..
        }
    ));
}

#[tokio::test]
async fn panicking_chunk_task_fails_only_its_chunk() {
    let finalizer = Stub::new("F:");
    let strategy = map_reduce(
        Arc::new(Panicking { marker: "w1" }),
        finalizer.clone(),
        3,
        FailurePolicy::FailFast,
    );

    let error = strategy
        .run(&words(3), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        SummarizeError::PartialBatchFailure {
            failed,
            failures,
            total,
        } => {
            assert_eq!(failed, vec![1]);
            assert_eq!(failures.len(), 1);
            assert!(failures[0].message.contains("panicked"));
            assert_eq!(total, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(finalizer.calls().is_empty());
}

#[tokio::test]
async fn best_effort_reduces_around_a_panicking_chunk() {
    let strategy = map_reduce(
        Arc::new(Panicking { marker: "w1" }),
        Stub::new("F:"),
        3,
        FailurePolicy::BestEffort,
    );

    let output = strategy
        .run(&words(3), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(output.summary, "F:S:w0\nS:w2");
    assert_eq!(output.missing_chunks, vec![1]);
}

#[tokio::test(start_paused = true)]
async fn timed_out_chunk_is_reported_by_index() {
    let limit = Duration::from_millis(100);
    let slow = Arc::new(Slow {
        marker: "w2",
        delay: Duration::from_secs(5),
    });
    let strategy = MapReduceStrategy::new(
        ChunkSummarizer::new(slow).with_timeout(Some(limit)),
        FinalSummarizer::new(Stub::new("F:")),
        MapReduceOptions {
            max_concurrency: 4,
            failure_policy: FailurePolicy::FailFast,
        },
    )
    .expect("valid options");

    let error = strategy
        .run(&words(4), &one_word_chunks(), &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        SummarizeError::PartialBatchFailure {
            failed, failures, ..
        } => {
            assert_eq!(failed, vec![2]);
            assert!(failures[0].message.contains("timed out"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_outstanding_chunk_tasks() {
    let hanging = Arc::new(Hanging::default());
    let strategy = map_reduce(hanging.clone(), Stub::new("F:"), 3, FailurePolicy::FailFast);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let error = strategy
        .run(&words(6), &one_word_chunks(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(error, SummarizeError::Cancelled));

    tokio::time::sleep(Duration::from_millis(10)).await;
    let started = hanging.started.load(Ordering::SeqCst);
    assert_eq!(started, 3, "only the permitted tasks should have started");
    assert_eq!(hanging.dropped.load(Ordering::SeqCst), started);
}

#[tokio::test]
async fn invalid_split_configuration_fails_before_any_call() {
    assert!(SplitConfig::new(0, 0, SplitUnit::Word).is_err());
    assert!(SplitConfig::new(5, 5, SplitUnit::Word).is_err());
    assert!(SplitConfig::new(5, 4, SplitUnit::Word).is_ok());

    let rejected = MapReduceStrategy::new(
        ChunkSummarizer::new(Stub::new("S:")),
        FinalSummarizer::new(Stub::new("F:")),
        MapReduceOptions {
            max_concurrency: 0,
            failure_policy: FailurePolicy::FailFast,
        },
    );
    assert!(matches!(
        rejected,
        Err(SummarizeError::InvalidConfiguration(_))
    ));
}
