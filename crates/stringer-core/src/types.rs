use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Graph-construction heuristic used to group items into clusters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStrategy {
    /// Union any pair scoring at or above the threshold; clusters are the
    /// connected components. Fast, but one bridging pair can chain two
    /// distinct stories together.
    #[default]
    ConnectedComponents,
    /// Seed newest-first and admit a candidate only if its average similarity
    /// to all current members clears the threshold.
    GreedyAverage,
    /// Seed newest-first and admit a candidate only if its minimum similarity
    /// to every current member clears the threshold. Strictest; more
    /// singletons.
    GreedyMin,
    /// Connect two items only when each appears in the other's top-k neighbor
    /// set, then take connected components of that mutual graph.
    MutualK,
}

impl ClusterStrategy {
    /// All strategies, in a stable order. Used for per-strategy config
    /// validation and for exercising every algorithm in tests and benches.
    pub const ALL: [ClusterStrategy; 4] = [
        ClusterStrategy::ConnectedComponents,
        ClusterStrategy::GreedyAverage,
        ClusterStrategy::GreedyMin,
        ClusterStrategy::MutualK,
    ];

    /// Returns the snake_case name used in configuration files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStrategy::ConnectedComponents => "connected_components",
            ClusterStrategy::GreedyAverage => "greedy_average",
            ClusterStrategy::GreedyMin => "greedy_min",
            ClusterStrategy::MutualK => "mutual_k",
        }
    }
}

// =============================================================================
// Entity Structs (defined in stringer-core for shared use)
// =============================================================================

/// A single news item as produced by the upstream fetch pipeline.
///
/// Items are immutable during a clustering pass. The embedding is optional
/// because freshly-ingested items may not have been vectorized yet; such
/// items are excluded from clustering and counted, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub title: String,
    pub embedding: Option<Vec<f32>>,
    pub published_at: DateTime<Utc>,
}

impl NewsItem {
    /// Whether the item carries an embedding of the expected dimension.
    pub fn has_usable_embedding(&self, dimension: usize) -> bool {
        self.embedding
            .as_ref()
            .is_some_and(|e| e.len() == dimension)
    }

    /// The embedding vector, or an empty slice when none is attached.
    /// Cosine similarity against an empty slice is 0 by convention.
    pub fn vector(&self) -> &[f32] {
        self.embedding.as_deref().unwrap_or(&[])
    }
}

/// A finished group of items judged to describe the same story.
///
/// `items` is ordered newest-first after post-processing; `item_ids` is the
/// same membership as a set for disjointness checks and fast lookup. Clusters
/// from one run never share an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub items: Vec<NewsItem>,
    pub item_ids: HashSet<Uuid>,
}

impl Cluster {
    /// Build a cluster from its members, deriving the id set.
    pub fn from_items(items: Vec<NewsItem>) -> Self {
        let item_ids = items.iter().map(|item| item.id).collect();
        Self { items, item_ids }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.item_ids.contains(id)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_item(title: &str, embedding: Option<Vec<f32>>) -> NewsItem {
        NewsItem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            embedding,
            published_at: Utc::now(),
        }
    }

    #[test]
    fn test_strategy_serialization() {
        let strategy = ClusterStrategy::ConnectedComponents;
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(json, "\"connected_components\"");

        let deserialized: ClusterStrategy = serde_json::from_str("\"mutual_k\"").unwrap();
        assert_eq!(deserialized, ClusterStrategy::MutualK);
    }

    #[test]
    fn test_strategy_unknown_name_rejected() {
        let result: std::result::Result<ClusterStrategy, _> =
            serde_json::from_str("\"agglomerative\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_strategy_default() {
        assert_eq!(
            ClusterStrategy::default(),
            ClusterStrategy::ConnectedComponents
        );
    }

    #[test]
    fn test_strategy_as_str_matches_serde() {
        for strategy in ClusterStrategy::ALL {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy.as_str()));
        }
    }

    #[test]
    fn test_usable_embedding() {
        let good = make_item("a", Some(vec![0.1; 384]));
        let wrong_dim = make_item("b", Some(vec![0.1; 10]));
        let missing = make_item("c", None);

        assert!(good.has_usable_embedding(384));
        assert!(!wrong_dim.has_usable_embedding(384));
        assert!(!missing.has_usable_embedding(384));
        assert!(wrong_dim.has_usable_embedding(10));
    }

    #[test]
    fn test_vector_defaults_to_empty() {
        let missing = make_item("c", None);
        assert!(missing.vector().is_empty());

        let good = make_item("a", Some(vec![1.0, 2.0]));
        assert_eq!(good.vector(), &[1.0, 2.0]);
    }

    #[test]
    fn test_cluster_from_items() {
        let a = make_item("a", Some(vec![0.1; 4]));
        let b = make_item("b", Some(vec![0.2; 4]));
        let ids = [a.id, b.id];

        let cluster = Cluster::from_items(vec![a, b]);
        assert_eq!(cluster.len(), 2);
        assert!(!cluster.is_empty());
        assert!(cluster.contains(&ids[0]));
        assert!(cluster.contains(&ids[1]));
        assert!(!cluster.contains(&Uuid::new_v4()));
    }

    #[test]
    fn test_cluster_roundtrip() {
        let cluster = Cluster::from_items(vec![make_item("a", Some(vec![0.5; 4]))]);
        let json = serde_json::to_string(&cluster).unwrap();
        let back: Cluster = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.item_ids, cluster.item_ids);
    }
}
