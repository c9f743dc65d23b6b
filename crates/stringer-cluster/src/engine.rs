//! Clustering engine: one entry point turning a batch of items into event
//! clusters.
//!
//! The engine is stateless across calls. Each run validates the
//! configuration, drops items without usable embeddings, builds the oracle
//! stack for this batch, dispatches to the configured strategy, and
//! post-processes the raw groups.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stringer_core::{Cluster, ClusterConfig, ClusterStrategy, NewsItem};
use stringer_vector::{
    BruteForceOracle, DynSimilarityOracle, DynVectorSearch, FallbackOracle, IndexOracle,
};

use crate::error::ClusterError;
use crate::postprocess::post_process;
use crate::strategy;

/// Result of one clustering run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterOutcome {
    /// Final clusters: pairwise disjoint, together covering every usable
    /// item of the batch.
    pub clusters: Vec<Cluster>,
    /// Items excluded up front because their embedding was missing or had
    /// the wrong dimension.
    pub skipped: usize,
}

/// Stateless clustering service.
///
/// Holds only its collaborators: the expected embedding dimension and an
/// optional index-backed search. Nothing survives between batches, so two
/// runs over the same input always agree.
pub struct ClusterEngine {
    dimension: usize,
    search: Option<Arc<dyn DynVectorSearch>>,
}

impl ClusterEngine {
    /// Engine without an index backend; every run scores brute force.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            search: None,
        }
    }

    /// Engine backed by an external vector search. Brute force remains the
    /// in-run fallback when the backend lacks the capability or times out.
    pub fn with_search(dimension: usize, search: Arc<dyn DynVectorSearch>) -> Self {
        Self {
            dimension,
            search: Some(search),
        }
    }

    /// Cluster one batch of items under `config`.
    ///
    /// Items without a usable embedding are excluded and counted in the
    /// outcome, never an error. Dropping the returned future cancels the
    /// run; partial progress is discarded, nothing needs undoing.
    pub async fn cluster(
        &self,
        items: &[NewsItem],
        config: &ClusterConfig,
    ) -> Result<ClusterOutcome, ClusterError> {
        config.validate()?;
        let params = config.params_for(config.strategy);

        let usable: Vec<NewsItem> = items
            .iter()
            .filter(|item| item.has_usable_embedding(self.dimension))
            .cloned()
            .collect();
        let skipped = items.len() - usable.len();
        if skipped > 0 {
            warn!(
                "Excluded {} of {} items without usable embeddings",
                skipped,
                items.len()
            );
        }
        if usable.is_empty() {
            return Ok(ClusterOutcome {
                clusters: Vec::new(),
                skipped,
            });
        }

        let usable = Arc::new(usable);
        let oracle = self.build_oracle(
            &usable,
            params.similarity_threshold,
            Duration::from_millis(config.search_timeout_ms),
        );

        let groups = match config.strategy {
            ClusterStrategy::ConnectedComponents => {
                strategy::connected_components(&usable, oracle.as_ref(), params).await?
            }
            ClusterStrategy::GreedyAverage => {
                strategy::greedy_average(&usable, oracle.as_ref(), params).await?
            }
            ClusterStrategy::GreedyMin => {
                strategy::greedy_min(&usable, oracle.as_ref(), params).await?
            }
            ClusterStrategy::MutualK => {
                strategy::mutual_k(&usable, oracle.as_ref(), params).await?
            }
        };
        debug!(
            "Strategy {} produced {} raw groups",
            config.strategy.as_str(),
            groups.len()
        );

        let clusters = post_process(groups, &usable, params);
        info!(
            "Clustered {} items into {} clusters via {} ({} skipped)",
            usable.len(),
            clusters.len(),
            config.strategy.as_str(),
            skipped
        );
        Ok(ClusterOutcome { clusters, skipped })
    }

    /// The oracle stack for one batch: index-backed with brute-force
    /// failover when a backend is attached, plain brute force otherwise.
    fn build_oracle(
        &self,
        batch: &Arc<Vec<NewsItem>>,
        threshold: f64,
        timeout: Duration,
    ) -> Box<dyn DynSimilarityOracle> {
        let brute = BruteForceOracle::new(Arc::clone(batch), threshold);
        match &self.search {
            Some(backend) => {
                let primary = IndexOracle::new(Arc::clone(backend), threshold, timeout);
                Box::new(FallbackOracle::new(Box::new(primary), Box::new(brute)))
            }
            None => Box::new(brute),
        }
    }
}
