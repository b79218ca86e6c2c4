use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use campus_core::corpus::read_corpus;
use campus_core::{DocId, IndexStats, Metadata, SearchEngine, SearchError, SearchOptions, Tokenizer};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;
const PREVIEW_CHARS: usize = 80;
const SNIPPET_BEFORE: usize = 60;
const SNIPPET_AFTER: usize = 140;

pub type Engine = SearchEngine<Box<dyn Tokenizer>>;
type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_floor")]
    pub floor: f32,
}
fn default_k() -> usize { 10 }
fn default_floor() -> f32 { SearchOptions::default().relevance_floor }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    /// Matches above the floor before truncation to `k`.
    pub total_hits: usize,
    pub results: Vec<SearchHitView>,
}

#[derive(Serialize)]
pub struct SearchHitView {
    pub doc_id: DocId,
    pub score: f32,
    pub title: String,
    pub link: Option<String>,
    pub snippet: Option<String>,
    pub metadata: Metadata,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub corpus_path: PathBuf,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(engine: Engine, corpus_path: impl Into<PathBuf>) -> Self {
        Self { engine: Arc::new(engine), corpus_path: corpus_path.into(), admin_token: None }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    /// Re-read the corpus file and swap in a fresh index. Blocking.
    pub fn reload(&self) -> Result<IndexStats, SearchError> {
        let docs = read_corpus(&self.corpus_path)?;
        self.engine.load(docs)
    }
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn error_response(e: SearchError) -> (StatusCode, String) {
    let status = match &e {
        e if e.is_load_rejection() => StatusCode::UNPROCESSABLE_ENTITY,
        SearchError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<SearchResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_K);
    // rank everything above the floor so total_hits counts past k
    let opts = SearchOptions::new(usize::MAX, params.floor).map_err(error_response)?;
    let hits = state.engine.search(&params.q, &opts).map_err(error_response)?;
    let total_hits = hits.len();

    let raw_terms: Vec<String> = params.q.split_whitespace().map(|s| s.to_string()).collect();
    let patterns = term_patterns(&raw_terms);
    let results = hits
        .into_iter()
        .take(k)
        .map(|hit| {
            let field = |key: &str| hit.metadata.get(key).and_then(|v| v.as_str()).map(str::to_string);
            let snippet = field("content").and_then(|c| make_snippet(&c, &patterns));
            SearchHitView {
                doc_id: hit.doc_id,
                score: hit.score,
                title: field("title").unwrap_or_default(),
                link: field("link"),
                snippet,
                metadata: hit.metadata,
            }
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits, took_ms = elapsed.as_millis() as u64, "search");
    Ok(Json(SearchResponse { query: params.q, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> ApiResult<serde_json::Value> {
    match state.engine.document(doc_id).map_err(error_response)? {
        Some(doc) => Ok(Json(serde_json::json!({
            "doc_id": doc.id,
            "num_tokens": doc.tokens.len(),
            "metadata": doc.metadata,
        }))),
        None => Err((StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> ApiResult<IndexStats> {
    state.engine.stats().map(Json).map_err(error_response)
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<IndexStats> {
    authorize(&state, &headers)?;
    let stats = tokio::task::spawn_blocking(move || state.reload())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("reload task failed: {e}")))?
        .map_err(error_response)?;
    Ok(Json(stats))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}

/// Case-insensitive literal matchers for the raw query words.
fn term_patterns(terms: &[String]) -> Vec<Regex> {
    terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .filter_map(|t| RegexBuilder::new(&regex::escape(t)).case_insensitive(true).build().ok())
        .collect()
}

/// Window of `content` around the first query-word match with matches wrapped
/// in `<em>`. Without a match, the first few characters followed by `...`.
fn make_snippet(content: &str, patterns: &[Regex]) -> Option<String> {
    if content.is_empty() { return None; }
    let first = patterns.iter().find_map(|p| p.find(content)).map(|m| content[..m.start()].chars().count());
    let chars: Vec<char> = content.chars().collect();
    let snippet = match first {
        Some(idx) => {
            let start = idx.saturating_sub(SNIPPET_BEFORE);
            let end = (idx + SNIPPET_AFTER).min(chars.len());
            let mut s = String::new();
            if start > 0 { s.push_str("..."); }
            s.extend(&chars[start..end]);
            if end < chars.len() { s.push_str("..."); }
            s
        }
        None => {
            let mut s: String = chars.iter().take(PREVIEW_CHARS).collect();
            s.push_str("...");
            s
        }
    };
    Some(highlight_terms(&snippet, patterns))
}

fn highlight_terms(snippet: &str, patterns: &[Regex]) -> String {
    let mut s = snippet.to_string();
    for pat in patterns {
        s = pat.replace_all(&s, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string();
    }
    s
}
