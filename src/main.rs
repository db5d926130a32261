use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rustysum::{
    config, logging,
    processing::{
        Document, DocumentMetadata, FailurePolicy, ServiceOptions, SplitConfig, SplitUnit,
        Strategy, SummarizationService,
    },
    summarization,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "rustysum",
    about = "Summarize documents too large for a single model context window"
)]
struct Cli {
    /// Document to summarize, or `-` to read stdin.
    path: PathBuf,
    /// Aggregation strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::MapReduce)]
    strategy: StrategyArg,
    /// Units per chunk (overrides CHUNK_SIZE).
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Units shared by adjacent chunks (overrides OVERLAP_SIZE).
    #[arg(long)]
    overlap: Option<usize>,
    /// Unit chunk sizes are counted in (overrides SPLIT_UNIT).
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,
    /// Maximum chunk summaries in flight (overrides MAP_REDUCE_MAX_CONCURRENCY).
    #[arg(long)]
    max_concurrency: Option<usize>,
    /// Reduce over the chunks that succeeded instead of failing the run.
    #[arg(long)]
    best_effort: bool,
    /// Document title, used for log context.
    #[arg(long)]
    title: Option<String>,
    /// Document author, used for log context.
    #[arg(long)]
    author: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Stuff,
    Refine,
    MapReduce,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Stuff => Strategy::Stuff,
            StrategyArg::Refine => Strategy::Refine,
            StrategyArg::MapReduce => Strategy::MapReduce,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitArg {
    Word,
    Sentence,
    Paragraph,
}

impl From<UnitArg> for SplitUnit {
    fn from(value: UnitArg) -> Self {
        match value {
            UnitArg::Word => SplitUnit::Word,
            UnitArg::Sentence => SplitUnit::Sentence,
            UnitArg::Paragraph => SplitUnit::Paragraph,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _log_guard = logging::init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "Run failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;

    let mut options = ServiceOptions::from_config(config)?;
    options.split = SplitConfig::new(
        cli.chunk_size.unwrap_or(options.split.chunk_size()),
        cli.overlap.unwrap_or(options.split.overlap_size()),
        cli.unit.map(SplitUnit::from).unwrap_or(options.split.unit()),
    )?;
    if let Some(max_concurrency) = cli.max_concurrency {
        options.map_reduce.max_concurrency = max_concurrency;
    }
    if cli.best_effort {
        options.map_reduce.failure_policy = FailurePolicy::BestEffort;
    }

    let summarizers = summarization::build_summarizers(config)?;
    let service = SummarizationService::new(summarizers, options)?;

    let document = load_document(&cli.path)
        .await?
        .with_metadata(DocumentMetadata {
            title: cli.title,
            author: cli.author,
        });

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling summarization");
            on_interrupt.cancel();
        }
    });

    let outcome = service
        .summarize(&document, cli.strategy.into(), &cancel)
        .await
        .context("summarization failed")?;

    println!("{}", outcome.summary);
    if !outcome.missing_chunks.is_empty() {
        tracing::warn!(missing = ?outcome.missing_chunks, "Summary omits failed chunks");
    }
    let split = service.split_config();
    tracing::info!(
        run_id = %outcome.run_id,
        strategy = outcome.strategy.as_str(),
        chunks = outcome.chunk_count,
        chunk_size = split.chunk_size(),
        overlap = split.overlap_size(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Summarization complete"
    );
    tracing::debug!(metrics = ?service.metrics_snapshot(), "Run metrics");
    Ok(())
}

async fn load_document(path: &Path) -> Result<Document> {
    let text = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("failed to read document from stdin")?;
        buffer
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read document {}", path.display()))?
    };
    Ok(Document::new(text))
}
