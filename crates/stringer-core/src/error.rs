use thiserror::Error;

/// Top-level error type for the Stringer system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define their
/// own error types and convert into `StringerError` (or wrap it) so that the
/// `?` operator works seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StringerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Clustering error: {0}")]
    Clustering(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for StringerError {
    fn from(err: toml::de::Error) -> Self {
        StringerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for StringerError {
    fn from(err: toml::ser::Error) -> Self {
        StringerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StringerError {
    fn from(err: serde_json::Error) -> Self {
        StringerError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Stringer operations.
pub type Result<T> = std::result::Result<T, StringerError>;
