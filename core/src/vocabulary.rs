use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Result, SearchError};
use crate::TermId;

/// How term frequency is counted when choosing which terms make the vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyMode {
    /// Every occurrence across the corpus counts.
    #[default]
    Total,
    /// Each document counts a term at most once.
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    pub max_features: usize,
    pub frequency: FrequencyMode,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self { max_features: 10_000, frequency: FrequencyMode::Total }
    }
}

/// Bijection between terms and column indices `0..len()`.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    ids: HashMap<String, TermId>,
}

impl Vocabulary {
    /// Select up to `max_features` terms by descending frequency, ties broken
    /// by term byte order. Indices follow the selection order.
    pub fn build<'a, I>(docs: I, config: &VocabularyConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        if config.max_features == 0 {
            return Err(SearchError::InvalidArgument("max_features must be positive".into()));
        }

        let mut counts: HashMap<&'a str, u64> = HashMap::new();
        let mut num_docs = 0usize;
        for tokens in docs {
            num_docs += 1;
            match config.frequency {
                FrequencyMode::Total => {
                    for t in tokens {
                        *counts.entry(t.as_str()).or_insert(0) += 1;
                    }
                }
                FrequencyMode::Document => {
                    let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
                    for t in unique {
                        *counts.entry(t).or_insert(0) += 1;
                    }
                }
            }
        }
        if num_docs == 0 {
            return Err(SearchError::EmptyCorpus("corpus contains no documents"));
        }
        if counts.is_empty() {
            return Err(SearchError::EmptyCorpus("corpus contains no terms"));
        }

        let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(config.max_features);

        let terms: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        let ids = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as TermId))
            .collect();
        Ok(Self { terms, ids })
    }

    pub fn get(&self, term: &str) -> Option<TermId> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Terms in index order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str)> + '_ {
        self.terms.iter().enumerate().map(|(i, t)| (i as TermId, t.as_str()))
    }
}
