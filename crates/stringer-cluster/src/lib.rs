//! News-topic clustering for Stringer.
//!
//! Groups a batch of embedded news items into event clusters. Four
//! strategies (single-link connected components, greedy average/minimum
//! linkage, mutual nearest neighbors) share one similarity-oracle boundary,
//! so the same code runs against an external vector index or a local
//! brute-force scan.

pub mod engine;
pub mod error;
pub mod postprocess;
pub mod strategy;
pub mod unionfind;

pub use engine::{ClusterEngine, ClusterOutcome};
pub use error::ClusterError;
pub use unionfind::UnionFind;
