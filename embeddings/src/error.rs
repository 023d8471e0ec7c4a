//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Two vectors that must share a dimension do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A size, count or threshold parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A parallel text sequence does not line up with its vectors.
    #[error("text count mismatch: {candidates} candidates, {texts} texts")]
    TextCountMismatch { candidates: usize, texts: usize },

    /// A parallel metadata sequence does not line up with its vectors.
    #[error("metadata count mismatch: {candidates} candidates, {metadata} metadata entries")]
    MetadataCountMismatch { candidates: usize, metadata: usize },

    /// The embedding provider failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbeddingError {
    pub(crate) fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
        if a.len() != b.len() {
            return Err(Self::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        Ok(())
    }
}
