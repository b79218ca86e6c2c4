//! TF-IDF weighting over a frozen vocabulary.
//!
//! Indexing fits the IDF table from the corpus and weights every document;
//! query vectorization reuses that table untouched, so terms the vocabulary
//! never saw are simply dropped.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::vector::SparseVector;
use crate::vocabulary::Vocabulary;
use crate::{DocId, TermId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weighting {
    /// Use `1 + ln(tf)` instead of the raw count.
    pub sublinear_tf: bool,
    /// `ln((1 + N) / (1 + df)) + 1` when set, `ln(N / df) + 1` otherwise.
    pub smooth_idf: bool,
}

impl Default for Weighting {
    fn default() -> Self {
        Self { sublinear_tf: false, smooth_idf: true }
    }
}

impl Weighting {
    fn tf(&self, count: u32) -> f32 {
        if self.sublinear_tf { 1.0 + (count as f32).ln() } else { count as f32 }
    }

    fn idf(&self, num_docs: usize, df: u32) -> f32 {
        let n = num_docs as f32;
        let df = df as f32;
        if self.smooth_idf {
            ((1.0 + n) / (1.0 + df)).ln() + 1.0
        } else {
            // a vocabulary term always occurs somewhere, so df >= 1
            (n / df.max(1.0)).ln() + 1.0
        }
    }
}

/// Per-column inverse document frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdfTable(Vec<f32>);

impl IdfTable {
    pub fn get(&self, term: TermId) -> Option<f32> {
        self.0.get(term as usize).copied()
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn as_slice(&self) -> &[f32] { &self.0 }
}

/// One L2-normalized row per document, columns are vocabulary indices.
#[derive(Debug, Clone, Default)]
pub struct DocumentTermMatrix {
    rows: Vec<SparseVector>,
    num_cols: usize,
}

impl DocumentTermMatrix {
    pub fn num_rows(&self) -> usize { self.rows.len() }

    pub fn num_cols(&self) -> usize { self.num_cols }

    pub fn row(&self, doc: DocId) -> Option<&SparseVector> {
        self.rows.get(doc as usize)
    }

    pub fn rows(&self) -> impl Iterator<Item = (DocId, &SparseVector)> + '_ {
        self.rows.iter().enumerate().map(|(i, r)| (i as DocId, r))
    }

    pub fn nnz(&self) -> u64 {
        self.rows.iter().map(|r| r.nnz() as u64).sum()
    }
}

/// Counts of in-vocabulary terms, keyed by column so iteration is ascending.
fn term_counts(tokens: &[String], vocab: &Vocabulary) -> BTreeMap<TermId, u32> {
    let mut counts = BTreeMap::new();
    for t in tokens {
        if let Some(id) = vocab.get(t) {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
}

fn weigh(counts: BTreeMap<TermId, u32>, idf: &IdfTable, weighting: &Weighting) -> SparseVector {
    let mut v = SparseVector::from_sorted(
        counts
            .into_iter()
            .map(|(id, count)| (id, weighting.tf(count) * idf.get(id).unwrap_or(0.0))),
    );
    v.normalize();
    v
}

pub struct TfIdfIndexer<'v> {
    vocab: &'v Vocabulary,
    weighting: Weighting,
}

impl<'v> TfIdfIndexer<'v> {
    pub fn new(vocab: &'v Vocabulary, weighting: Weighting) -> Self {
        Self { vocab, weighting }
    }

    /// Fit the IDF table on `docs` and weight every document with it.
    pub fn index<'a, I>(&self, docs: I) -> (DocumentTermMatrix, IdfTable)
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let counts: Vec<BTreeMap<TermId, u32>> =
            docs.into_iter().map(|tokens| term_counts(tokens, self.vocab)).collect();

        let mut df = vec![0u32; self.vocab.len()];
        for row in &counts {
            for &id in row.keys() {
                df[id as usize] += 1;
            }
        }
        let idf = IdfTable(df.iter().map(|&d| self.weighting.idf(counts.len(), d)).collect());

        let rows = counts.into_iter().map(|c| weigh(c, &idf, &self.weighting)).collect();
        (DocumentTermMatrix { rows, num_cols: self.vocab.len() }, idf)
    }
}

/// Projects queries into an already-fitted space.
pub struct QueryVectorizer<'a> {
    vocab: &'a Vocabulary,
    idf: &'a IdfTable,
    weighting: Weighting,
}

impl<'a> QueryVectorizer<'a> {
    pub fn new(vocab: &'a Vocabulary, idf: &'a IdfTable, weighting: Weighting) -> Self {
        Self { vocab, idf, weighting }
    }

    pub fn vectorize(&self, tokens: &[String]) -> SparseVector {
        weigh(term_counts(tokens, self.vocab), self.idf, &self.weighting)
    }

    /// Query tokens the vocabulary does not know, deduplicated, in query order.
    pub fn unknown_terms<'q>(&self, tokens: &'q [String]) -> Vec<&'q str> {
        let mut seen = HashSet::new();
        tokens
            .iter()
            .map(String::as_str)
            .filter(|t| self.vocab.get(t).is_none() && seen.insert(*t))
            .collect()
    }
}
