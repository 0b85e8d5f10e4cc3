//! Flat exact nearest-neighbour index.
//!
//! Vectors are L2-normalized on insert so the dot product against a
//! normalized query is the cosine similarity. Every search is a full scan,
//! which keeps filtered searches exact: the predicate runs before ranking
//! and truncation, never after.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::content::CanvasDocument;
use crate::{CanvasId, CanvasSearchError, Result, UserId};

/// Index-assigned identifier of a stored vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attributes stored alongside each vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub canvas_id: CanvasId,
    pub owner_id: UserId,
    pub title: String,
    pub is_public: bool,
    pub text: String,
}

impl From<&CanvasDocument> for EntryMetadata {
    #[inline]
    fn from(document: &CanvasDocument) -> Self {
        Self {
            canvas_id: document.canvas_id,
            owner_id: document.owner_id,
            title: document.title.clone(),
            is_public: document.is_public,
            text: document.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub metadata: EntryMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry_id: EntryId,
    pub metadata: EntryMetadata,
    /// Cosine similarity in `[-1, 1]`
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    entries: BTreeMap<EntryId, IndexEntry>,
    /// Next id to hand out, never decreases
    next_id: u64,
    dimension: Option<usize>,
}

impl VectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a vector and return the id it was assigned.
    ///
    /// The first insert fixes the index dimension; later vectors of another
    /// length are rejected.
    #[inline]
    pub fn add(&mut self, vector: Vec<f32>, metadata: EntryMetadata) -> Result<EntryId> {
        if vector.is_empty() {
            return Err(CanvasSearchError::Embedding(
                "cannot index an empty vector".to_string(),
            ));
        }
        self.check_dimension(vector.len())?;

        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.dimension.get_or_insert(vector.len());
        self.entries.insert(
            id,
            IndexEntry {
                vector: normalized(vector),
                metadata,
            },
        );

        Ok(id)
    }

    /// Remove the given entries, ignoring unknown ids. Returns how many were removed.
    ///
    /// Removing the last entry releases the dimension, so the next insert
    /// may fix a new one.
    #[inline]
    pub fn delete(&mut self, ids: &[EntryId]) -> usize {
        let removed = ids
            .iter()
            .filter(|id| self.entries.remove(*id).is_some())
            .count();
        if self.entries.is_empty() {
            self.dimension = None;
        }
        removed
    }

    /// Drop every entry and the dimension. The id counter keeps counting.
    #[inline]
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.dimension = None;
        removed
    }

    #[inline]
    pub fn similarity_search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredEntry>> {
        self.search_filtered(query, limit, |_| true)
    }

    /// Top `limit` entries accepted by `predicate`, best first.
    ///
    /// Ties on score are broken by ascending id, which is insertion order.
    #[inline]
    pub fn search_filtered<F>(
        &self,
        query: &[f32],
        limit: usize,
        predicate: F,
    ) -> Result<Vec<ScoredEntry>>
    where
        F: Fn(&EntryMetadata) -> bool,
    {
        if limit == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let query = normalized(query.to_vec());
        let mut results: Vec<ScoredEntry> = self
            .entries
            .iter()
            .filter(|(_, entry)| predicate(&entry.metadata))
            .map(|(id, entry)| ScoredEntry {
                entry_id: *id,
                metadata: entry.metadata.clone(),
                score: dot(&entry.vector, &query).clamp(-1.0, 1.0),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });
        results.truncate(limit);

        Ok(results)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub fn get(&self, id: EntryId) -> Option<&IndexEntry> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: EntryId) -> bool {
        self.entries.contains_key(&id)
    }

    #[inline]
    pub fn entry_ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.entries.keys().copied()
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != len => Err(CanvasSearchError::DimensionMismatch {
                expected,
                actual: len,
            }),
            _ => Ok(()),
        }
    }
}

fn normalized(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
