use std::cmp::Ordering;

use crate::TermId;

/// Sparse vector over vocabulary columns. Indices are strictly ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    indices: Vec<TermId>,
    weights: Vec<f32>,
}

impl SparseVector {
    /// Build from (column, weight) pairs already sorted by column with no repeats.
    /// Zero weights are dropped.
    pub fn from_sorted(entries: impl IntoIterator<Item = (TermId, f32)>) -> Self {
        let mut v = Self::default();
        for (idx, w) in entries {
            debug_assert!(v.indices.last().map_or(true, |&last| last < idx), "indices must ascend");
            if w != 0.0 {
                v.indices.push(idx);
                v.weights.push(w);
            }
        }
        v
    }

    pub fn is_zero(&self) -> bool { self.indices.is_empty() }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize { self.indices.len() }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f32)> + '_ {
        self.indices.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn get(&self, idx: TermId) -> Option<f32> {
        self.indices.binary_search(&idx).ok().map(|pos| self.weights[pos])
    }

    pub fn norm(&self) -> f32 {
        self.weights.iter().map(|w| w * w).sum::<f32>().sqrt()
    }

    /// Scale to unit Euclidean length. A zero vector stays zero.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm == 0.0 {
            return;
        }
        for w in self.weights.iter_mut() {
            *w /= norm;
        }
    }

    /// Dot product by merging the two index lists.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    sum += self.weights[i] * other.weights[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}
