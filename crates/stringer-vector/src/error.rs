use thiserror::Error;

/// Errors from the similarity-search and embedding boundaries.
#[derive(Debug, Error)]
pub enum VectorError {
    /// The backing store cannot serve vector search at all (no vector index,
    /// operator unsupported). Recoverable: callers fall back to brute force.
    #[error("vector search unsupported: {0}")]
    Unsupported(String),

    /// One search call exceeded its deadline.
    #[error("vector search timed out after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// Any other backend failure. Fails the batch.
    #[error("vector search backend: {0}")]
    Backend(String),

    /// The embedding provider cannot produce a vector right now; skip the
    /// item and retry later.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),
}

impl VectorError {
    /// Whether the failover path should treat this as the store lacking the
    /// search capability (fall back to brute force) rather than as a
    /// batch-fatal failure. Timeouts count as capability failures.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            VectorError::Unsupported(_) | VectorError::Timeout { .. }
        )
    }
}
