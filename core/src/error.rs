use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The corpus had no documents, or no term survived vocabulary selection.
    #[error("empty corpus: {0}")]
    EmptyCorpus(&'static str),

    /// A corpus record is missing a required field. `position` is the 0-based record index.
    #[error("corpus record {position} is missing required field `{field}`")]
    CorpusFormat { position: usize, field: String },

    #[error("search engine has no index loaded")]
    NotReady,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    pub fn corpus_format(position: usize, field: impl Into<String>) -> Self {
        SearchError::CorpusFormat { position, field: field.into() }
    }

    /// True for errors that reject a corpus at load time.
    pub fn is_load_rejection(&self) -> bool {
        matches!(self, SearchError::EmptyCorpus(_) | SearchError::CorpusFormat { .. })
    }
}
