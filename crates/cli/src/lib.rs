use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sift_indexer::{read_pages, PageIndexer};
use sift_search::HybridRetriever;
use sift_vector_store::{EmbeddingConfig, InMemoryVectorStore, Metadata, VectorStore};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod config;

pub use config::{AppConfig, SearchConfig, DEFAULT_CONFIG_FILE};

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Hybrid dense + BM25 search over crawled pages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./sift.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store file, overrides `[store] path`
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index crawled pages from a JSONL file
    Index(IndexArgs),

    /// Search the store
    Search(SearchArgs),

    /// Remove every document from the store
    Clear,
}

#[derive(Args)]
struct IndexArgs {
    /// JSONL file with one `{url, markdown, depth?, metadata?}` object per line
    #[arg(long, short)]
    input: PathBuf,

    /// Root URL recorded as `website` metadata
    #[arg(long)]
    website: Option<String>,

    /// Skip pages with fewer words
    #[arg(long)]
    min_words: Option<usize>,
}

#[derive(Args)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Return dense results without BM25 re-ranking
    #[arg(long)]
    no_rerank: bool,

    /// Timeout for the dense search, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct SearchHit<'a> {
    id: &'a str,
    score: f32,
    text: &'a str,
    metadata: &'a Metadata,
}

#[derive(Serialize)]
struct ClearOutput {
    removed: usize,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.store {
        config.store.path = path;
    }
    apply_api_key_env(&mut config.store.embedding);

    match cli.command {
        Commands::Index(args) => run_index(args, config).await,
        Commands::Search(args) => run_search(args, config).await,
        Commands::Clear => run_clear(config).await,
    }
}

/// Fill an empty OpenAI key from the environment
fn apply_api_key_env(embedding: &mut EmbeddingConfig) {
    if let EmbeddingConfig::OpenAi { api_key, .. } = embedding {
        if api_key.trim().is_empty() {
            if let Ok(key) = std::env::var(OPENAI_API_KEY_ENV) {
                *api_key = key;
            }
        }
    }
}

async fn run_index(args: IndexArgs, mut config: AppConfig) -> Result<()> {
    if args.website.is_some() {
        config.indexer.website = args.website;
    }
    if let Some(min_words) = args.min_words {
        config.indexer.word_count_threshold = min_words;
    }
    config.validate()?;

    let pages = read_pages(&args.input)
        .await
        .with_context(|| format!("failed to read pages from {}", args.input.display()))?;
    let store = InMemoryVectorStore::open(&config.store).await?;
    let stats = PageIndexer::new(config.indexer)?.index(&store, pages).await?;
    store.save(&config.store.path).await?;

    log::info!(
        "Store {} now holds {} documents",
        config.store.path.display(),
        store.len().await
    );
    print_json(&stats)
}

async fn run_search(args: SearchArgs, mut config: AppConfig) -> Result<()> {
    if let Some(top_k) = args.top_k {
        config.search.top_k = top_k;
    }
    if args.no_rerank {
        config.search.rerank = false;
    }
    if args.timeout_ms.is_some() {
        config.search.timeout_ms = args.timeout_ms;
    }
    config.validate()?;

    let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::open(&config.store).await?);
    let mut retriever = HybridRetriever::new(store);
    if let Some(ms) = config.search.timeout_ms {
        retriever = retriever.with_timeout(Duration::from_millis(ms));
    }

    let results = retriever
        .search(&args.query, config.search.top_k, config.search.rerank)
        .await?;

    let hits: Vec<SearchHit<'_>> = results
        .iter()
        .map(|hit| SearchHit {
            id: &hit.document.id,
            score: hit.score,
            text: &hit.document.text,
            metadata: &hit.document.metadata,
        })
        .collect();
    print_json(&hits)
}

async fn run_clear(config: AppConfig) -> Result<()> {
    config.store.validate()?;

    let store = InMemoryVectorStore::open(&config.store).await?;
    let removed = store.clear().await;
    store.save(&config.store.path).await?;

    log::info!("Removed {} documents", removed);
    print_json(&ClearOutput { removed })
}
