//! Vector similarity layer for Stringer.
//!
//! Defines the search backend boundary ([`VectorSearch`]), an in-memory
//! exact index, the similarity oracles the clustering strategies consume,
//! and the embedding provider boundary with a deterministic mock.

pub mod embedding;
pub mod error;
pub mod index;
pub mod oracle;

pub use embedding::{DynEmbeddingProvider, EmbeddingProvider, MockEmbedding};
pub use error::VectorError;
pub use index::{cosine_similarity, DynVectorSearch, InMemoryIndex, Neighbor, VectorSearch};
pub use oracle::{
    BruteForceOracle, DynSimilarityOracle, FallbackOracle, IndexOracle, MockOracle,
    SimilarityOracle,
};
