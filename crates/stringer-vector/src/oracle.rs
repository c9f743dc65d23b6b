//! Similarity oracle: top-K most similar items for a query item.
//!
//! - `IndexOracle` delegates to an external vector-search backend. This is
//!   the production path.
//! - `BruteForceOracle` scans the batch in process. It is the fallback when
//!   the store lacks vector search, and the reference for agreement tests.
//! - `FallbackOracle` composes the two: capability failures (including
//!   timeouts) flip it to brute force for the rest of the run.
//! - `MockOracle` serves scripted scores for deterministic tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use stringer_core::types::NewsItem;

use crate::error::VectorError;
use crate::index::{cosine_similarity, sort_by_score_desc, DynVectorSearch, Neighbor};

/// Hard ceiling on candidates requested from the backend per query.
const MAX_NUM_CANDIDATES: usize = 200;

/// Recall multiplier: candidates requested per neighbor wanted.
const CANDIDATE_MULTIPLIER: usize = 20;

/// Answers "which other items look like this one?".
///
/// `top_similar` returns at most `limit` neighbors, descending by score,
/// every score at or above the oracle's threshold, never the query item
/// itself. Ties break by ascending id so the ordering is total.
pub trait SimilarityOracle: Send + Sync {
    /// Top `limit` neighbors of `item`.
    fn top_similar(
        &self,
        item: &NewsItem,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Neighbor>, VectorError>> + Send;

    /// Neighbor lists for a batch of items, in input order.
    ///
    /// For strategies whose neighbor computation has no inter-item ordering
    /// dependency. The default fetches sequentially; an implementation backed
    /// by a remote index may override it to batch or fan out, as long as the
    /// returned order matches the input order.
    fn top_similar_many(
        &self,
        items: &[NewsItem],
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Vec<Neighbor>>, VectorError>> + Send {
        async move {
            let mut lists = Vec::with_capacity(items.len());
            for item in items {
                lists.push(self.top_similar(item, limit).await?);
            }
            Ok(lists)
        }
    }

    /// Pairwise similarity between two items under this oracle's measure.
    ///
    /// Embeddings are already in memory, so no backend round trip happens
    /// here. Greedy strategies use this to judge a candidate against every
    /// current member of a growing cluster, including pairs that would fall
    /// below the retrieval threshold.
    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64;
}

/// Object-safe version of [`SimilarityOracle`] for dynamic dispatch.
///
/// Because the trait methods return `impl Future` they are not object-safe.
/// This trait uses boxed futures instead, allowing
/// `Box<dyn DynSimilarityOracle>` to be stored in structs without generics.
///
/// A blanket implementation is provided so that every `SimilarityOracle`
/// automatically implements `DynSimilarityOracle`.
pub trait DynSimilarityOracle: Send + Sync {
    /// Top `limit` neighbors of `item` (boxed future).
    fn top_similar_boxed<'a>(
        &'a self,
        item: &'a NewsItem,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Neighbor>, VectorError>> + Send + 'a>>;

    /// Neighbor lists for a batch of items, in input order (boxed future).
    fn top_similar_many_boxed<'a>(
        &'a self,
        items: &'a [NewsItem],
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<Neighbor>>, VectorError>> + Send + 'a>>;

    /// Pairwise similarity between two items under this oracle's measure.
    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64;
}

impl<T: SimilarityOracle> DynSimilarityOracle for T {
    fn top_similar_boxed<'a>(
        &'a self,
        item: &'a NewsItem,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Neighbor>, VectorError>> + Send + 'a>> {
        Box::pin(self.top_similar(item, limit))
    }

    fn top_similar_many_boxed<'a>(
        &'a self,
        items: &'a [NewsItem],
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<Neighbor>>, VectorError>> + Send + 'a>> {
        Box::pin(self.top_similar_many(items, limit))
    }

    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64 {
        SimilarityOracle::score(self, a, b)
    }
}

// ---------------------------------------------------------------------------
// IndexOracle - external vector-search backend
// ---------------------------------------------------------------------------

/// Index-backed oracle delegating to an external similarity search.
///
/// Requests `min(200, limit * 20)` candidates for recall, applies a per-call
/// timeout, and filters the returned hits by threshold. The backend is asked
/// to exclude the query item; the filter here enforces it regardless.
pub struct IndexOracle {
    backend: Arc<dyn DynVectorSearch>,
    threshold: f64,
    timeout: Duration,
}

impl IndexOracle {
    pub fn new(backend: Arc<dyn DynVectorSearch>, threshold: f64, timeout: Duration) -> Self {
        Self {
            backend,
            threshold,
            timeout,
        }
    }

    fn num_candidates(limit: usize) -> usize {
        limit.saturating_mul(CANDIDATE_MULTIPLIER).min(MAX_NUM_CANDIDATES)
    }
}

impl SimilarityOracle for IndexOracle {
    async fn top_similar(
        &self,
        item: &NewsItem,
        limit: usize,
    ) -> Result<Vec<Neighbor>, VectorError> {
        let num_candidates = Self::num_candidates(limit);
        let exclude = [item.id];
        let search = self
            .backend
            .search_boxed(item.vector(), num_candidates, limit, &exclude);

        let hits = match tokio::time::timeout(self.timeout, search).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(VectorError::Timeout {
                    waited_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        let mut neighbors: Vec<Neighbor> = hits
            .into_iter()
            .filter(|hit| hit.id != item.id && hit.score >= self.threshold)
            .collect();
        sort_by_score_desc(&mut neighbors);
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64 {
        cosine_similarity(a.vector(), b.vector())
    }
}

// ---------------------------------------------------------------------------
// BruteForceOracle - in-process scan over the batch
// ---------------------------------------------------------------------------

/// Fallback oracle: brute-force cosine against every other same-dimension
/// item in the batch, sorted and truncated to the requested limit.
///
/// Agrees with [`IndexOracle`] over an exact backend on identical input.
pub struct BruteForceOracle {
    items: Arc<Vec<NewsItem>>,
    threshold: f64,
}

impl BruteForceOracle {
    pub fn new(items: Arc<Vec<NewsItem>>, threshold: f64) -> Self {
        Self { items, threshold }
    }
}

impl SimilarityOracle for BruteForceOracle {
    async fn top_similar(
        &self,
        item: &NewsItem,
        limit: usize,
    ) -> Result<Vec<Neighbor>, VectorError> {
        let query = item.vector();
        let mut neighbors: Vec<Neighbor> = self
            .items
            .iter()
            .filter(|other| other.id != item.id && other.vector().len() == query.len())
            .map(|other| Neighbor {
                id: other.id,
                score: cosine_similarity(query, other.vector()),
            })
            .filter(|neighbor| neighbor.score >= self.threshold)
            .collect();

        sort_by_score_desc(&mut neighbors);
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64 {
        cosine_similarity(a.vector(), b.vector())
    }
}

// ---------------------------------------------------------------------------
// FallbackOracle - capability failover
// ---------------------------------------------------------------------------

/// Composite oracle that fails over from an index-backed primary to a
/// brute-force fallback when the store lacks the capability or times out.
///
/// The switch is sticky for the lifetime of the oracle (one clustering run)
/// and logged exactly once. Backend failures that are not capability
/// failures propagate untouched and fail the batch.
pub struct FallbackOracle {
    primary: Box<dyn DynSimilarityOracle>,
    fallback: Box<dyn DynSimilarityOracle>,
    degraded: AtomicBool,
}

impl FallbackOracle {
    pub fn new(
        primary: Box<dyn DynSimilarityOracle>,
        fallback: Box<dyn DynSimilarityOracle>,
    ) -> Self {
        Self {
            primary,
            fallback,
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the run has switched to the brute-force path.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

impl SimilarityOracle for FallbackOracle {
    async fn top_similar(
        &self,
        item: &NewsItem,
        limit: usize,
    ) -> Result<Vec<Neighbor>, VectorError> {
        if !self.is_degraded() {
            match self.primary.top_similar_boxed(item, limit).await {
                Ok(neighbors) => return Ok(neighbors),
                Err(err) if err.is_capability_failure() => {
                    warn!(
                        error = %err,
                        "index-backed similarity unavailable, using brute force for this run"
                    );
                    self.degraded.store(true, Ordering::Relaxed);
                }
                Err(err) => return Err(err),
            }
        }
        self.fallback.top_similar_boxed(item, limit).await
    }

    // Pairwise scoring never touches the backend, so the fallback's local
    // measure answers for both paths.
    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64 {
        self.fallback.score(a, b)
    }
}

// ---------------------------------------------------------------------------
// MockOracle - scripted scores for deterministic tests
// ---------------------------------------------------------------------------

/// Oracle backed by a fixed symmetric similarity table.
///
/// Pairs that were never scripted score 0. No vectors, no network; repeated
/// runs see byte-identical answers, which is what determinism tests need.
#[derive(Debug, Clone)]
pub struct MockOracle {
    scores: HashMap<(Uuid, Uuid), f64>,
    threshold: f64,
}

impl MockOracle {
    pub fn new(threshold: f64) -> Self {
        Self {
            scores: HashMap::new(),
            threshold,
        }
    }

    /// Script the similarity for a pair, in both directions.
    pub fn with_score(mut self, a: Uuid, b: Uuid, score: f64) -> Self {
        self.scores.insert((a, b), score);
        self.scores.insert((b, a), score);
        self
    }
}

impl SimilarityOracle for MockOracle {
    async fn top_similar(
        &self,
        item: &NewsItem,
        limit: usize,
    ) -> Result<Vec<Neighbor>, VectorError> {
        let mut neighbors: Vec<Neighbor> = self
            .scores
            .iter()
            .filter(|((from, _), _)| *from == item.id)
            .map(|((_, to), score)| Neighbor {
                id: *to,
                score: *score,
            })
            .filter(|neighbor| neighbor.score >= self.threshold)
            .collect();

        sort_by_score_desc(&mut neighbors);
        neighbors.truncate(limit);
        Ok(neighbors)
    }

    fn score(&self, a: &NewsItem, b: &NewsItem) -> f64 {
        self.scores.get(&(a.id, b.id)).copied().unwrap_or(0.0)
    }
}
