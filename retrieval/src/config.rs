//! Configuration for the retrieval engine.

use std::path::Path;

use serde::{Deserialize, Serialize};
use simsearch_embeddings::cache::DEFAULT_MAX_ENTRIES;
use simsearch_embeddings::dedup::DEFAULT_DEDUP_THRESHOLD;
use simsearch_embeddings::{ChunkOptions, EmbeddingConfig, SearchOptions, TokenChunkOptions};

use crate::error::{Result, RetrievalError};

/// Configuration for the retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Embedding model configuration.
    pub embedding: EmbeddingConfig,

    /// How documents are split before embedding.
    pub chunking: ChunkingStrategy,

    /// Default search parameters for queries.
    pub search: SearchOptions,

    /// Chunks at least this similar to an already stored chunk are dropped.
    /// `None` keeps every chunk.
    pub dedup_threshold: Option<f32>,

    /// Maximum number of cached embeddings.
    pub cache_max_entries: usize,
}

impl RetrievalConfig {
    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the chunking strategy.
    pub fn with_chunking(mut self, chunking: ChunkingStrategy) -> Self {
        self.chunking = chunking;
        self
    }

    /// Set the default search parameters.
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    /// Set or disable the deduplication threshold.
    pub fn with_dedup_threshold(mut self, threshold: Option<f32>) -> Self {
        self.dedup_threshold = threshold;
        self
    }

    /// Set the cache size.
    pub fn with_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.cache_max_entries = max_entries;
        self
    }

    /// Check every section of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.embedding.validate()?;
        self.chunking.validate()?;

        if self.cache_max_entries == 0 {
            return Err(RetrievalError::Config(
                "cache_max_entries must be greater than zero".to_string(),
            ));
        }
        if self.dedup_threshold.is_some_and(f32::is_nan) {
            return Err(RetrievalError::Config(
                "dedup_threshold must be a number".to_string(),
            ));
        }
        if self.search.threshold.is_nan() {
            return Err(RetrievalError::Config(
                "search threshold must be a number".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            chunking: ChunkingStrategy::default(),
            search: SearchOptions::default(),
            dedup_threshold: Some(DEFAULT_DEDUP_THRESHOLD),
            cache_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// How documents are split into chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Paragraph grouping on a separator.
    Separator(ChunkOptions),
    /// Approximate token windows cut at sentence boundaries.
    Tokens(TokenChunkOptions),
}

impl ChunkingStrategy {
    /// Split a text according to this strategy.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        let chunks = match self {
            Self::Separator(options) => simsearch_embeddings::chunk_text(text, options)?,
            Self::Tokens(options) => simsearch_embeddings::chunk_by_tokens(text, options)?,
        };
        Ok(chunks)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Separator(options) => options.validate()?,
            Self::Tokens(options) => options.validate()?,
        }
        Ok(())
    }
}

impl Default for ChunkingStrategy {
    fn default() -> Self {
        Self::Separator(ChunkOptions::default())
    }
}
