//! TF-IDF vector-space search over a static, pre-tokenized corpus.
//!
//! Load a corpus into a [`SearchEngine`], then query it:
//!
//! ```
//! use campus_core::{DocInput, EngineConfig, SearchEngine, SearchOptions, WhitespaceTokenizer};
//!
//! let engine = SearchEngine::new(WhitespaceTokenizer, EngineConfig::default());
//! engine.load(vec![
//!     DocInput::new(["scholarship", "exam"]).with_field("title", "Exam").with_field("link", "/1"),
//!     DocInput::new(["cafeteria", "menu"]).with_field("title", "Menu").with_field("link", "/2"),
//! ]).unwrap();
//! let hits = engine.search("scholarship", &SearchOptions::default()).unwrap();
//! assert_eq!(hits[0].doc_id, 0);
//! ```

pub mod corpus;
pub mod engine;
pub mod error;
pub mod index;
pub mod rank;
pub mod tfidf;
pub mod tokenizer;
pub mod vector;
pub mod vocabulary;

pub use engine::{EngineConfig, EngineState, SearchEngine, SearchHit};
pub use error::{Result, SearchError};
pub use index::{DocId, DocInput, Document, Index, IndexStats, Metadata, TermId};
pub use rank::{ScoredDoc, SearchOptions};
pub use tfidf::Weighting;
pub use tokenizer::{StandardTokenizer, Tokenizer, WhitespaceTokenizer};
pub use vocabulary::{FrequencyMode, VocabularyConfig};
