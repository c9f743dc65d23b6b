//! Embedding providers.
//!
//! Clustering consumes embeddings computed upstream; this module only defines
//! the provider boundary (so ingestion can be wired in) and a deterministic
//! mock used by tests and benchmarks.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;

use crate::error::VectorError;

/// Turns text into a fixed-dimension embedding vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str)
        -> impl Future<Output = Result<Vec<f32>, VectorError>> + Send;

    /// The dimension of vectors this provider produces.
    fn dimension(&self) -> usize;
}

/// Object-safe version of [`EmbeddingProvider`] for dynamic dispatch.
pub trait DynEmbeddingProvider: Send + Sync {
    /// Embed a single text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, VectorError>> + Send + 'a>>;

    /// The dimension of vectors this provider produces.
    fn dimension(&self) -> usize;
}

impl<T: EmbeddingProvider> DynEmbeddingProvider for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, VectorError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimension(&self) -> usize {
        EmbeddingProvider::dimension(self)
    }
}

/// Deterministic hash-based embedding for tests and benchmarks.
///
/// Each component is a hash of the text and the component index, scaled to
/// [-1, 1]; the vector is then L2-normalized. The same text always maps to
/// the same vector, and distinct texts land far apart often enough to
/// exercise threshold logic.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimension: usize,
}

impl MockEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        if text.is_empty() {
            return Err(VectorError::EmbeddingUnavailable(
                "cannot embed empty text".to_string(),
            ));
        }

        let mut vector = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let hashed = hasher.finish();
            // Map the hash onto [-1, 1].
            let component = (hashed % 2001) as f32 / 1000.0 - 1.0;
            vector.push(component);
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
