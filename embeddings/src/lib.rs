//! # Embeddings
//!
//! Similarity search and deduplication over in-memory text embeddings.
//!
//! ## Features
//!
//! - **Vector Math**: cosine similarity, euclidean distance, dot product, L2 normalization
//! - **Caching**: bounded FIFO cache of computed embeddings
//! - **Chunking**: paragraph- and token-window splitting of long texts
//! - **Similarity Search**: brute-force top-K ranking with a score threshold
//! - **Deduplication**: first-wins removal of near-duplicate vectors
//! - **Providers**: any type implementing [`EmbeddingProvider`] can supply vectors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  text ──► chunker ──► EmbeddingProvider ──► EmbeddingCache      │
//! │                             │                                   │
//! │                             ▼                                   │
//! │                       similarity (normalize)                    │
//! │                        │            │                           │
//! │                        ▼            ▼                           │
//! │                     search        dedup                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod chunker;
pub mod config;
pub mod dedup;
pub mod error;
pub mod provider;
pub mod search;
pub mod similarity;

pub use cache::{CacheStats, CachedProvider, EmbeddingCache};
pub use chunker::{ChunkOptions, TokenChunkOptions, chunk_by_tokens, chunk_text};
pub use config::EmbeddingConfig;
pub use dedup::deduplicate_by_similarity;
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingClient, EmbeddingProvider, HashingProvider};
pub use search::{SearchOptions, SearchResult, search_similar};
pub use similarity::{
    cosine_similarity, cosine_similarity_matrix, dot_product, euclidean_distance, normalize,
};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (varies by model).
pub const DEFAULT_DIMENSION: usize = 1536; // OpenAI text-embedding-3-small
