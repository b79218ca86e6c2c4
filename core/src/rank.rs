use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::tfidf::DocumentTermMatrix;
use crate::vector::SparseVector;
use crate::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Minimum cosine similarity, inclusive.
    pub relevance_floor: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { top_k: 10, relevance_floor: 0.05 }
    }
}

impl SearchOptions {
    pub fn new(top_k: usize, relevance_floor: f32) -> Result<Self> {
        let opts = Self { top_k, relevance_floor };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(SearchError::InvalidArgument("top_k must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.relevance_floor) {
            return Err(SearchError::InvalidArgument(format!(
                "relevance_floor must be within [0, 1], got {}",
                self.relevance_floor
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

/// Score every row against `query`, keep those at or above the floor, and
/// return the best `top_k` by descending score, ties by ascending doc id.
///
/// Rows and query are unit length, so the dot product is the cosine.
/// A row sharing no term with the query scores 0 and is never returned.
pub fn rank(query: &SparseVector, matrix: &DocumentTermMatrix, opts: &SearchOptions) -> Vec<ScoredDoc> {
    if query.is_zero() {
        return Vec::new();
    }
    let mut scored: Vec<ScoredDoc> = matrix
        .rows()
        .map(|(doc_id, row)| ScoredDoc { doc_id, score: row.dot(query) })
        .filter(|s| s.score > 0.0 && s.score >= opts.relevance_floor)
        .collect();

    scored.sort_unstable_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
    scored.truncate(opts.top_k);
    scored
}
