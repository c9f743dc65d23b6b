use thiserror::Error;

use stringer_core::StringerError;
use stringer_vector::VectorError;

/// Errors surfaced by a clustering run.
///
/// Capability failures from the search backend never appear here; the oracle
/// stack absorbs them by falling back to brute force. What remains is either
/// a configuration rejected up front or a backend failure that fails the
/// whole batch.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("clustering configuration invalid: {0}")]
    Config(String),

    #[error("similarity search failed: {0}")]
    Search(String),
}

impl From<StringerError> for ClusterError {
    fn from(err: StringerError) -> Self {
        match err {
            StringerError::Config(message) => ClusterError::Config(message),
            other => ClusterError::Config(other.to_string()),
        }
    }
}

impl From<VectorError> for ClusterError {
    fn from(err: VectorError) -> Self {
        ClusterError::Search(err.to_string())
    }
}
