use anyhow::{Context, Result};
use campus_core::{EngineConfig, SearchEngine, StandardTokenizer, Tokenizer, VocabularyConfig, WhitespaceTokenizer};
use campus_server::{build_app, AppState};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, ValueEnum)]
enum TokenizerKind {
    Standard,
    Whitespace,
}

#[derive(Parser)]
struct Args {
    /// Corpus path (JSON/JSONL file or directory)
    #[arg(long, default_value = "./corpus.jsonl")]
    corpus: String,
    /// Vocabulary size cap
    #[arg(long, default_value_t = 10_000)]
    max_features: usize,
    /// Tokenizer applied to queries
    #[arg(long, value_enum, default_value_t = TokenizerKind::Standard)]
    tokenizer: TokenizerKind,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let tokenizer: Box<dyn Tokenizer> = match args.tokenizer {
        TokenizerKind::Standard => Box::new(StandardTokenizer),
        TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer),
    };
    let config = EngineConfig {
        vocabulary: VocabularyConfig { max_features: args.max_features, ..Default::default() },
        ..Default::default()
    };
    let state = AppState::new(SearchEngine::new(tokenizer, config), &args.corpus)
        .with_admin_token(std::env::var("ADMIN_TOKEN").ok());

    // Load before binding so the first request already has an index
    let loader = state.clone();
    let stats = tokio::task::spawn_blocking(move || loader.reload())
        .await?
        .with_context(|| format!("loading corpus {}", args.corpus))?;
    tracing::info!(num_docs = stats.num_docs, vocabulary_size = stats.vocabulary_size, "corpus indexed");

    let app = build_app(state);
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
