//! The search engine lifecycle: `Unindexed` until the first successful
//! [`SearchEngine::load`], `Indexed` afterwards.
//!
//! Each load builds a complete [`Index`] before touching shared state and
//! then swaps the `Arc` in one step. Searches clone the current `Arc` and
//! work lock-free from there, so they always see one load's vocabulary,
//! IDF table and matrix together.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;

use crate::error::{Result, SearchError};
use crate::index::{DocInput, Document, Index, IndexStats, Metadata};
use crate::rank::{rank, SearchOptions};
use crate::tfidf::{QueryVectorizer, TfIdfIndexer, Weighting};
use crate::tokenizer::{StandardTokenizer, Tokenizer};
use crate::vocabulary::{Vocabulary, VocabularyConfig};
use crate::DocId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub vocabulary: VocabularyConfig,
    pub weighting: Weighting,
    /// Metadata keys every document must carry.
    pub required_fields: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vocabulary: VocabularyConfig::default(),
            weighting: Weighting::default(),
            required_fields: vec!["title".into(), "link".into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Unindexed,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f32,
    pub metadata: Metadata,
}

pub struct SearchEngine<T = StandardTokenizer> {
    tokenizer: T,
    config: EngineConfig,
    current: RwLock<Option<Arc<Index>>>,
    // serializes loads so a slow build cannot overwrite a newer one
    load_lock: Mutex<()>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(StandardTokenizer, EngineConfig::default())
    }
}

impl<T: Tokenizer> SearchEngine<T> {
    pub fn new(tokenizer: T, config: EngineConfig) -> Self {
        Self { tokenizer, config, current: RwLock::new(None), load_lock: Mutex::new(()) }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn tokenizer(&self) -> &T { &self.tokenizer }

    pub fn state(&self) -> EngineState {
        if self.current.read().is_some() { EngineState::Indexed } else { EngineState::Unindexed }
    }

    /// Build a new index from `corpus` and make it current. On error the
    /// previously loaded index (if any) stays in place.
    pub fn load(&self, corpus: Vec<DocInput>) -> Result<IndexStats> {
        let _guard = self.load_lock.lock();
        let start = Instant::now();
        let index = match build_index(corpus, &self.tokenizer, &self.config) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "corpus rejected, keeping previous index");
                return Err(e);
            }
        };
        let stats = index.stats.clone();
        *self.current.write() = Some(Arc::new(index));
        tracing::info!(
            num_docs = stats.num_docs,
            vocabulary_size = stats.vocabulary_size,
            nnz = stats.nnz,
            empty_docs = stats.empty_docs,
            took_ms = start.elapsed().as_millis() as u64,
            "index loaded"
        );
        Ok(stats)
    }

    /// The current index. Holding the returned `Arc` keeps that load alive
    /// even if a reload swaps in a newer one.
    pub fn snapshot(&self) -> Result<Arc<Index>> {
        self.current.read().clone().ok_or(SearchError::NotReady)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        Ok(self.snapshot()?.stats.clone())
    }

    pub fn document(&self, id: DocId) -> Result<Option<Document>> {
        Ok(self.snapshot()?.document(id).cloned())
    }

    /// Tokenize `query` and rank the corpus against it. Queries that share no
    /// term with the vocabulary return an empty list.
    pub fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>> {
        let index = self.snapshot()?;
        let tokens = self.tokenizer.tokenize(query);
        search_index(&index, &tokens, opts)
    }

    /// Rank against an already-segmented query. Each token still gets the
    /// same normalization document tokens got at load.
    pub fn search_tokens(&self, tokens: &[String], opts: &SearchOptions) -> Result<Vec<SearchHit>> {
        let index = self.snapshot()?;
        search_index(&index, &normalize_tokens(tokens, &self.tokenizer), opts)
    }
}

fn search_index(index: &Index, tokens: &[String], opts: &SearchOptions) -> Result<Vec<SearchHit>> {
    opts.validate()?;
    let vectorizer = QueryVectorizer::new(&index.vocabulary, &index.idf, index.weighting);
    let query = vectorizer.vectorize(tokens);
    if query.is_zero() {
        tracing::debug!(tokens = tokens.len(), unknown = ?vectorizer.unknown_terms(tokens), "query has no vocabulary terms");
        return Ok(Vec::new());
    }
    let hits: Vec<SearchHit> = rank(&query, &index.matrix, opts)
        .into_iter()
        .filter_map(|s| {
            index.document(s.doc_id).map(|doc| SearchHit {
                doc_id: s.doc_id,
                score: s.score,
                metadata: doc.metadata.clone(),
            })
        })
        .collect();
    tracing::debug!(query_terms = query.nnz(), hits = hits.len(), "search complete");
    Ok(hits)
}

/// Run every document token through the query tokenizer so both sides of
/// the dot product share one normalization. Tokens may split or vanish.
fn normalize_tokens<T: Tokenizer>(tokens: &[String], tokenizer: &T) -> Vec<String> {
    tokens.iter().flat_map(|t| tokenizer.tokenize(t)).collect()
}

fn build_index<T: Tokenizer>(corpus: Vec<DocInput>, tokenizer: &T, config: &EngineConfig) -> Result<Index> {
    if corpus.is_empty() {
        return Err(SearchError::EmptyCorpus("corpus contains no documents"));
    }
    if corpus.len() > DocId::MAX as usize {
        return Err(SearchError::InvalidArgument(format!("corpus of {} documents is too large", corpus.len())));
    }
    for (position, doc) in corpus.iter().enumerate() {
        if let Some(field) = config.required_fields.iter().find(|f| !doc.metadata.contains_key(f.as_str())) {
            return Err(SearchError::corpus_format(position, field.clone()));
        }
    }

    let documents: Vec<Document> = corpus
        .into_iter()
        .enumerate()
        .map(|(i, d)| Document {
            id: i as DocId,
            tokens: normalize_tokens(&d.tokens, tokenizer),
            metadata: d.metadata,
        })
        .collect();

    let vocabulary = Vocabulary::build(documents.iter().map(|d| d.tokens.as_slice()), &config.vocabulary)?;
    let (matrix, idf) =
        TfIdfIndexer::new(&vocabulary, config.weighting).index(documents.iter().map(|d| d.tokens.as_slice()));
    let stats = IndexStats {
        num_docs: documents.len() as u32,
        vocabulary_size: vocabulary.len() as u32,
        nnz: matrix.nnz(),
        empty_docs: matrix.rows().filter(|(_, r)| r.is_zero()).count() as u32,
        built_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
    };
    Ok(Index { vocabulary, idf, matrix, weighting: config.weighting, documents, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::WhitespaceTokenizer;

    fn doc(tokens: &[&str], title: &str) -> DocInput {
        DocInput::new(tokens.iter().copied()).with_field("title", title).with_field("link", format!("https://news/{title}"))
    }

    fn engine() -> SearchEngine<WhitespaceTokenizer> {
        SearchEngine::new(WhitespaceTokenizer, EngineConfig::default())
    }

    #[test]
    fn search_before_load_is_not_ready() {
        let e = engine();
        assert_eq!(e.state(), EngineState::Unindexed);
        assert!(matches!(e.search("x", &SearchOptions::default()), Err(SearchError::NotReady)));
        assert!(matches!(e.stats(), Err(SearchError::NotReady)));
    }

    #[test]
    fn load_reports_stats() {
        let e = engine();
        let stats = e.load(vec![doc(&["a", "b"], "one"), doc(&[], "two")]).unwrap();
        assert_eq!(e.state(), EngineState::Indexed);
        assert_eq!(stats.num_docs, 2);
        assert_eq!(stats.vocabulary_size, 2);
        assert_eq!(stats.nnz, 2);
        assert_eq!(stats.empty_docs, 1);
        assert!(!stats.built_at.is_empty());
    }

    #[test]
    fn missing_required_field_is_format_error() {
        let e = engine();
        let bad = DocInput::new(["a"]).with_field("title", "no link");
        let err = e.load(vec![doc(&["a"], "ok"), bad]).unwrap_err();
        match err {
            SearchError::CorpusFormat { position, field } => {
                assert_eq!(position, 1);
                assert_eq!(field, "link");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(e.state(), EngineState::Unindexed);
    }

    #[test]
    fn hits_echo_metadata() {
        let e = engine();
        e.load(vec![doc(&["exam"], "Exam week").with_field("views", 12)]).unwrap();
        let hits = e.search("EXAM", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata["title"], "Exam week");
        assert_eq!(hits[0].metadata["views"], 12);
    }

    #[test]
    fn document_tokens_share_query_normalization() {
        let e = SearchEngine::new(StandardTokenizer, EngineConfig::default());
        e.load(vec![doc(&["Exams", "the", "NJUPT"], "x")]).unwrap();
        let d = e.document(0).unwrap().unwrap();
        assert_eq!(d.tokens, vec!["exam", "njupt"]);
        assert_eq!(e.search("exam", &SearchOptions::default()).unwrap().len(), 1);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let e = engine();
        e.load(vec![doc(&["exam"], "x")]).unwrap();
        let opts = SearchOptions { top_k: 0, relevance_floor: 0.05 };
        assert!(matches!(e.search("exam", &opts), Err(SearchError::InvalidArgument(_))));
    }
}
