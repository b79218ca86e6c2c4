use serde::{Deserialize, Serialize};

use crate::tfidf::{DocumentTermMatrix, IdfTable, Weighting};
use crate::vocabulary::Vocabulary;

pub type TermId = u32;
pub type DocId = u32;

/// Display fields carried alongside a document (title, link, content, ...).
/// The engine only checks that required keys exist; values are echoed back as-is.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One corpus entry as handed to [`crate::SearchEngine::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocInput {
    pub tokens: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DocInput {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tokens: tokens.into_iter().map(Into::into).collect(), metadata: Metadata::new() }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub tokens: Vec<String>,
    pub metadata: Metadata,
}

impl Document {
    /// String value of a metadata field, if present and a string.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub num_docs: u32,
    pub vocabulary_size: u32,
    /// Non-zero entries across the document-term matrix.
    pub nnz: u64,
    /// Documents sharing no term with the vocabulary (all-zero rows).
    pub empty_docs: u32,
    pub built_at: String,
}

/// Everything one successful load produces. Never mutated once built;
/// a reload builds a fresh `Index` and swaps it in whole.
#[derive(Debug)]
pub struct Index {
    pub(crate) vocabulary: Vocabulary,
    pub(crate) idf: IdfTable,
    pub(crate) matrix: DocumentTermMatrix,
    pub(crate) weighting: Weighting,
    pub(crate) documents: Vec<Document>,
    pub(crate) stats: IndexStats,
}

impl Index {
    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }
    pub fn idf(&self) -> &IdfTable { &self.idf }
    pub fn matrix(&self) -> &DocumentTermMatrix { &self.matrix }
    pub fn weighting(&self) -> Weighting { self.weighting }
    pub fn documents(&self) -> &[Document] { &self.documents }
    pub fn document(&self, id: DocId) -> Option<&Document> { self.documents.get(id as usize) }
    pub fn stats(&self) -> &IndexStats { &self.stats }
}
