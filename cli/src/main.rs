use anyhow::{Context, Result};
use campus_core::corpus::read_corpus;
use campus_core::{
    EngineConfig, FrequencyMode, SearchEngine, SearchHit, SearchOptions, StandardTokenizer, Tokenizer,
    VocabularyConfig, Weighting, WhitespaceTokenizer,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

const PREVIEW_CHARS: usize = 80;

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Search a campus news corpus with TF-IDF ranking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the corpus and run a query (or read queries from stdin)
    Search {
        #[command(flatten)]
        index: IndexArgs,
        /// Query text; omit to read one query per line from stdin
        #[arg(long, short)]
        query: Option<String>,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Minimum similarity for a result to be shown
        #[arg(long, default_value_t = 0.05)]
        floor: f32,
        /// Print results as JSON lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load the corpus and print index statistics
    Stats {
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Corpus path (JSON/JSONL file or directory)
    #[arg(long)]
    corpus: String,
    /// Vocabulary size cap
    #[arg(long, default_value_t = 10_000)]
    max_features: usize,
    /// How term frequency is counted for vocabulary selection
    #[arg(long, value_enum, default_value_t = Frequency::Total)]
    frequency: Frequency,
    /// Use 1 + ln(tf) instead of raw term counts
    #[arg(long, default_value_t = false)]
    sublinear_tf: bool,
    /// Use ln(N/df) + 1 instead of the smoothed idf
    #[arg(long, default_value_t = false)]
    no_smooth_idf: bool,
    /// Tokenizer applied to queries and corpus tokens alike
    #[arg(long, value_enum, default_value_t = TokenizerKind::Standard)]
    tokenizer: TokenizerKind,
}

#[derive(Clone, Copy, ValueEnum)]
enum Frequency {
    Total,
    Document,
}

#[derive(Clone, Copy, ValueEnum)]
enum TokenizerKind {
    Standard,
    Whitespace,
}

impl IndexArgs {
    fn config(&self) -> EngineConfig {
        EngineConfig {
            vocabulary: VocabularyConfig {
                max_features: self.max_features,
                frequency: match self.frequency {
                    Frequency::Total => FrequencyMode::Total,
                    Frequency::Document => FrequencyMode::Document,
                },
            },
            weighting: Weighting { sublinear_tf: self.sublinear_tf, smooth_idf: !self.no_smooth_idf },
            ..Default::default()
        }
    }

    fn tokenizer(&self) -> Box<dyn Tokenizer> {
        match self.tokenizer {
            TokenizerKind::Standard => Box::new(StandardTokenizer),
            TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer),
        }
    }

    /// Read the corpus and build the index.
    fn open(&self) -> Result<SearchEngine<Box<dyn Tokenizer>>> {
        let engine = SearchEngine::new(self.tokenizer(), self.config());
        let docs = read_corpus(&self.corpus)
            .with_context(|| format!("reading corpus {}", self.corpus))?;
        engine.load(docs).with_context(|| format!("indexing corpus {}", self.corpus))?;
        Ok(engine)
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    took_s: f64,
    results: &'a [SearchHit],
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { index, query, top_k, floor, json } => {
            let engine = index.open()?;
            let opts = SearchOptions::new(top_k, floor)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            match query {
                Some(q) => run_query(&engine, &q, &opts, json, &mut out)?,
                None => {
                    for line in io::stdin().lock().lines() {
                        let line = line?;
                        if line.trim().is_empty() { continue; }
                        run_query(&engine, line.trim(), &opts, json, &mut out)?;
                        out.flush()?;
                    }
                }
            }
            Ok(())
        }
        Commands::Stats { index } => {
            let engine = index.open()?;
            let stats = engine.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn run_query<T: Tokenizer>(engine: &SearchEngine<T>, query: &str, opts: &SearchOptions, json: bool, out: &mut impl Write) -> Result<()> {
    let start = Instant::now();
    let hits = engine.search(query, opts)?;
    let took_s = start.elapsed().as_secs_f64();

    if json {
        serde_json::to_writer(&mut *out, &QueryOutput { query, took_s, results: &hits })?;
        writeln!(out)?;
        return Ok(());
    }

    if hits.is_empty() {
        writeln!(out, "no results for '{query}'")?;
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        let field = |k: &str| hit.metadata.get(k).and_then(|v| v.as_str()).unwrap_or("");
        writeln!(out, "{:>2}. {} <{}>", rank + 1, field("title"), field("link"))?;
        writeln!(out, "    relevance {:.2}", hit.score)?;
        let content = field("content");
        if !content.is_empty() {
            writeln!(out, "    {}", preview(content))?;
        }
    }
    writeln!(out, "{} results in {:.4}s", hits.len(), took_s)?;
    Ok(())
}

fn preview(text: &str) -> String {
    let mut s: String = text.chars().take(PREVIEW_CHARS).collect();
    s.push_str("...");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::DocInput;

    fn engine() -> SearchEngine<WhitespaceTokenizer> {
        let e = SearchEngine::new(WhitespaceTokenizer, EngineConfig::default());
        e.load(vec![
            DocInput::new(["scholarship", "exam"])
                .with_field("title", "Scholarship exam")
                .with_field("link", "https://news/1")
                .with_field("content", "The scholarship exam is on Friday."),
            DocInput::new(["cafeteria", "menu"]).with_field("title", "Menu").with_field("link", "https://news/2"),
        ])
        .unwrap();
        e
    }

    #[test]
    fn prints_ranked_results() {
        let mut buf = Vec::new();
        run_query(&engine(), "scholarship", &SearchOptions::default(), false, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(" 1. Scholarship exam <https://news/1>"));
        assert!(text.contains("The scholarship exam is on Friday...."));
        assert!(text.contains("1 results in"));
    }

    #[test]
    fn prints_no_results_message() {
        let mut buf = Vec::new();
        run_query(&engine(), "gym", &SearchOptions::default(), false, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "no results for 'gym'\n");
    }

    #[test]
    fn json_output_is_one_line_per_query() {
        let mut buf = Vec::new();
        run_query(&engine(), "menu", &SearchOptions::default(), true, &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["query"], "menu");
        assert_eq!(v["results"][0]["doc_id"], 1);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "奖".repeat(100);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn cli_args_parse() {
        let cli = Cli::try_parse_from(["campus", "search", "--corpus", "c.jsonl", "-q", "exam", "--frequency", "document"]).unwrap();
        match cli.command {
            Commands::Search { index, query, .. } => {
                assert_eq!(query.as_deref(), Some("exam"));
                assert_eq!(index.config().vocabulary.frequency, FrequencyMode::Document);
            }
            _ => panic!("expected search"),
        }
    }
}
