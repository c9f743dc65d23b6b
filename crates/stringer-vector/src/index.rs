//! Similarity-search boundary and an in-memory reference implementation.
//!
//! The external store that holds every known item is reached through the
//! [`VectorSearch`] trait. `InMemoryIndex` is the in-process stand-in: a
//! brute-force exact scan, which is what the agreement tests and deployments
//! without a vector-search-capable store use.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::error::VectorError;

/// A single scored neighbor returned from a similarity lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// The ID of the matching item.
    pub id: Uuid,
    /// Cosine similarity score in [-1, 1].
    pub score: f64,
}

/// External similarity-search capability.
///
/// `num_candidates` is a recall hint for approximate backends; `limit` caps
/// the returned hits; `exclude` filters ids out server-side (at minimum the
/// query item itself). An empty index returns `[]`, not an error.
pub trait VectorSearch: Send + Sync {
    fn search(
        &self,
        query: &[f32],
        num_candidates: usize,
        limit: usize,
        exclude: &[Uuid],
    ) -> impl Future<Output = Result<Vec<Neighbor>, VectorError>> + Send;
}

/// Object-safe version of [`VectorSearch`] for dynamic dispatch.
///
/// Because `VectorSearch::search` returns `impl Future` it is not
/// object-safe. This trait uses a boxed future instead, allowing
/// `Arc<dyn DynVectorSearch>` to be stored in structs without generics.
///
/// A blanket implementation is provided so that every `VectorSearch`
/// automatically implements `DynVectorSearch`.
pub trait DynVectorSearch: Send + Sync {
    fn search_boxed<'a>(
        &'a self,
        query: &'a [f32],
        num_candidates: usize,
        limit: usize,
        exclude: &'a [Uuid],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Neighbor>, VectorError>> + Send + 'a>>;
}

impl<T: VectorSearch> DynVectorSearch for T {
    fn search_boxed<'a>(
        &'a self,
        query: &'a [f32],
        num_candidates: usize,
        limit: usize,
        exclude: &'a [Uuid],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Neighbor>, VectorError>> + Send + 'a>> {
        Box::pin(self.search(query, num_candidates, limit, exclude))
    }
}

/// In-memory vector index using brute-force cosine similarity.
///
/// Thread-safe via interior RwLock. Exact, so `num_candidates` does not
/// apply; results are already the true top matches.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    entries: Arc<RwLock<HashMap<Uuid, Vec<f32>>>>,
}

impl InMemoryIndex {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a vector into the index.
    ///
    /// Overwrites any existing entry with the same ID.
    pub fn insert(&self, id: Uuid, embedding: Vec<f32>) -> Result<(), VectorError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| VectorError::Backend(format!("lock poisoned: {}", e)))?;
        entries.insert(id, embedding);
        Ok(())
    }

    /// Delete an entry from the index by ID.
    ///
    /// Returns Ok(()) regardless of whether the entry existed.
    pub fn delete(&self, id: Uuid) -> Result<(), VectorError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| VectorError::Backend(format!("lock poisoned: {}", e)))?;
        entries.remove(&id);
        Ok(())
    }

    /// Return the number of vectors currently stored in the index.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Return true if the index contains no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scan(&self, query: &[f32], limit: usize, exclude: &[Uuid]) -> Result<Vec<Neighbor>, VectorError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| VectorError::Backend(format!("lock poisoned: {}", e)))?;

        let mut scored: Vec<Neighbor> = entries
            .iter()
            .filter(|(id, _)| !exclude.contains(id))
            .map(|(id, embedding)| Neighbor {
                id: *id,
                score: cosine_similarity(query, embedding),
            })
            .collect();

        sort_by_score_desc(&mut scored);
        scored.truncate(limit);
        Ok(scored)
    }
}

impl VectorSearch for InMemoryIndex {
    async fn search(
        &self,
        query: &[f32],
        _num_candidates: usize,
        limit: usize,
        exclude: &[Uuid],
    ) -> Result<Vec<Neighbor>, VectorError> {
        self.scan(query, limit, exclude)
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort hits by descending score, ties broken by ascending id so the order
/// is total and repeated runs agree.
pub(crate) fn sort_by_score_desc(hits: &mut [Neighbor]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
