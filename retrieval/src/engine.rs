//! In-memory retrieval engine.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use simsearch_embeddings::{
    CacheStats, CachedProvider, Embedding, EmbeddingCache, EmbeddingClient, EmbeddingProvider,
    SearchOptions, SearchResult, deduplicate_by_similarity, search_similar,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{ChunkingStrategy, RetrievalConfig};
use crate::error::Result;

/// Where a stored chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Caller-supplied document identifier.
    pub document_id: String,

    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

/// Stored chunks as parallel columns, so searches can borrow them directly.
#[derive(Default)]
struct ChunkStore {
    embeddings: Vec<Embedding>,
    texts: Vec<String>,
    sources: Vec<ChunkSource>,
}

impl ChunkStore {
    fn push(&mut self, source: ChunkSource, text: String, embedding: Embedding) {
        self.sources.push(source);
        self.texts.push(text);
        self.embeddings.push(embedding);
    }

    fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether any stored chunk is at least `threshold` similar to `embedding`.
    fn has_near_duplicate(&self, embedding: &[f32], threshold: f32) -> Result<bool> {
        let nearest = search_similar(
            embedding,
            &self.embeddings,
            None,
            &SearchOptions::new(1, threshold),
        )?;
        Ok(!nearest.is_empty())
    }

    fn remove_document(&mut self, document_id: &str) -> usize {
        let old = std::mem::take(self);
        let mut removed = 0;

        for ((source, text), embedding) in old
            .sources
            .into_iter()
            .zip(old.texts)
            .zip(old.embeddings)
        {
            if source.document_id == document_id {
                removed += 1;
            } else {
                self.push(source, text, embedding);
            }
        }

        removed
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: String,

    /// Chunks produced by the chunker.
    pub chunks: usize,

    /// Chunks added to the store.
    pub stored: usize,

    /// Chunks dropped as near-duplicates.
    pub duplicates: usize,
}

/// Retrieval engine over an in-memory chunk store.
///
/// Documents are chunked, embedded through a batching client with an
/// embedding cache in front of it, optionally deduplicated, and kept in
/// memory. Queries are answered with brute-force cosine search.
pub struct RetrievalEngine<P> {
    /// Configuration.
    config: RetrievalConfig,

    /// Cache in front of the batching, normalizing client.
    embedder: CachedProvider<EmbeddingClient<P>>,

    /// Stored chunks.
    store: RwLock<ChunkStore>,
}

impl<P> RetrievalEngine<P>
where
    P: EmbeddingProvider,
{
    /// Create a new retrieval engine builder.
    pub fn builder() -> RetrievalEngineBuilder {
        RetrievalEngineBuilder::new()
    }

    /// Create an engine from a configuration and an embedding provider.
    pub fn new(config: RetrievalConfig, provider: P) -> Result<Self> {
        config.validate()?;

        let client = EmbeddingClient::new(provider, config.embedding.clone())?;
        let cache = EmbeddingCache::new(config.cache_max_entries)?;

        info!(
            "Initialized retrieval engine with provider {} ({})",
            client.name(),
            config.embedding.model
        );

        Ok(Self {
            config,
            embedder: CachedProvider::new(client, cache),
            store: RwLock::new(ChunkStore::default()),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Chunk, embed and store a document.
    pub async fn ingest(&self, document_id: &str, text: &str) -> Result<IngestReport> {
        let chunks = self.config.chunking.chunk(text)?;
        let mut report = IngestReport {
            document_id: document_id.to_string(),
            chunks: chunks.len(),
            stored: 0,
            duplicates: 0,
        };

        if chunks.is_empty() {
            debug!("Document {document_id} produced no chunks");
            return Ok(report);
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;

        // Within the document, the first of any near-duplicate group wins.
        let unique: HashSet<usize> = match self.config.dedup_threshold {
            Some(threshold) => deduplicate_by_similarity(&embeddings, threshold)?
                .into_iter()
                .collect(),
            None => (0..chunks.len()).collect(),
        };

        let mut store = self.store.write().await;
        for (chunk_index, (text, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            let is_duplicate = match self.config.dedup_threshold {
                Some(threshold) => {
                    !unique.contains(&chunk_index)
                        || store.has_near_duplicate(&embedding, threshold)?
                }
                None => false,
            };

            if is_duplicate {
                report.duplicates += 1;
                continue;
            }

            store.push(
                ChunkSource {
                    document_id: document_id.to_string(),
                    chunk_index,
                },
                text,
                embedding,
            );
            report.stored += 1;
        }

        info!(
            "Ingested {document_id}: {} chunks, {} stored, {} duplicates",
            report.chunks, report.stored, report.duplicates
        );
        Ok(report)
    }

    /// Search stored chunks with the configured search options.
    pub async fn query(&self, text: &str) -> Result<Vec<SearchResult>> {
        self.query_with(text, &self.config.search).await
    }

    /// Search stored chunks with explicit search options.
    ///
    /// Results carry the chunk text and `{document_id, chunk_index}` metadata.
    pub async fn query_with(
        &self,
        text: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let query = self.embedder.embed(text).await?;

        let store = self.store.read().await;
        debug!("Searching {} chunks", store.len());

        let results = search_similar(
            &query,
            &store.embeddings,
            Some(store.texts.as_slice()),
            options,
        )?;

        Ok(results
            .into_iter()
            .map(|result| {
                let source = &store.sources[result.index];
                let metadata = serde_json::json!({
                    "document_id": source.document_id,
                    "chunk_index": source.chunk_index,
                });
                result.with_metadata(metadata)
            })
            .collect())
    }

    /// Remove every chunk of a document. Returns the number removed.
    pub async fn remove_document(&self, document_id: &str) -> usize {
        let removed = self.store.write().await.remove_document(document_id);
        info!("Removed {removed} chunks of {document_id}");
        removed
    }

    /// Drop all stored chunks. The embedding cache is kept.
    pub async fn clear(&self) {
        *self.store.write().await = ChunkStore::default();
        info!("Cleared retrieval store");
    }

    /// Source of the chunk at a search result index.
    pub async fn source(&self, index: usize) -> Option<ChunkSource> {
        self.store.read().await.sources.get(index).cloned()
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        let store = self.store.read().await;
        let documents = store
            .sources
            .iter()
            .map(|s| s.document_id.as_str())
            .collect::<HashSet<_>>()
            .len();

        EngineStats {
            documents,
            chunks: store.len(),
            cache: self.embedder.cache().stats(),
        }
    }
}

/// Builder for the retrieval engine.
pub struct RetrievalEngineBuilder {
    config: RetrievalConfig,
}

impl RetrievalEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RetrievalConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: simsearch_embeddings::EmbeddingConfig) -> Self {
        self.config.embedding = config;
        self
    }

    /// Set the chunking strategy.
    pub fn with_chunking(mut self, chunking: ChunkingStrategy) -> Self {
        self.config.chunking = chunking;
        self
    }

    /// Set the default search parameters.
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.config.search = search;
        self
    }

    /// Set or disable the deduplication threshold.
    pub fn with_dedup_threshold(mut self, threshold: Option<f32>) -> Self {
        self.config.dedup_threshold = threshold;
        self
    }

    /// Set the cache size.
    pub fn with_cache_max_entries(mut self, max_entries: usize) -> Self {
        self.config.cache_max_entries = max_entries;
        self
    }

    /// Build the engine.
    pub fn build<P>(self, provider: P) -> Result<RetrievalEngine<P>>
    where
        P: EmbeddingProvider,
    {
        RetrievalEngine::new(self.config, provider)
    }
}

impl Default for RetrievalEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about the retrieval engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of distinct documents with stored chunks.
    pub documents: usize,

    /// Number of stored chunks.
    pub chunks: usize,

    /// Embedding cache statistics.
    pub cache: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simsearch_embeddings::{ChunkOptions, EmbeddingConfig, HashingProvider};

    fn engine(dedup: Option<f32>) -> RetrievalEngine<HashingProvider> {
        RetrievalEngine::<HashingProvider>::builder()
            .with_embedding(EmbeddingConfig::for_model("all-MiniLM-L6-v2"))
            .with_chunking(ChunkingStrategy::Separator(ChunkOptions::new(1, 0)))
            .with_dedup_threshold(dedup)
            .build(HashingProvider::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_and_query() {
        let engine = engine(None);
        let report = engine
            .ingest(
                "doc",
                "the cat sat on the mat\nstock prices fell sharply\nrain is expected tomorrow",
            )
            .await
            .unwrap();
        assert_eq!(report.stored, 3);

        let results = engine.query("where did the cat sit").await.unwrap();
        assert_eq!(results[0].text.as_deref(), Some("the cat sat on the mat"));
        assert_eq!(
            results[0].metadata,
            Some(serde_json::json!({"document_id": "doc", "chunk_index": 0}))
        );
    }

    #[tokio::test]
    async fn test_duplicate_chunks_dropped() {
        let engine = engine(Some(0.95));
        let report = engine
            .ingest("a", "hello world\nHello, World!\nsomething else")
            .await
            .unwrap();
        assert_eq!(report.chunks, 3);
        assert_eq!(report.stored, 2);
        assert_eq!(report.duplicates, 1);

        let again = engine.ingest("b", "hello world").await.unwrap();
        assert_eq!(again.stored, 0);
        assert_eq!(again.duplicates, 1);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let engine = engine(None);
        engine.ingest("a", "one\ntwo").await.unwrap();
        engine.ingest("b", "three").await.unwrap();
        assert_eq!(engine.stats().await.documents, 2);

        assert_eq!(engine.remove_document("a").await, 2);
        let stats = engine.stats().await;
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.chunks, 1);
        assert_eq!(
            engine.source(0).await,
            Some(ChunkSource {
                document_id: "b".to_string(),
                chunk_index: 0
            })
        );

        engine.clear().await;
        assert_eq!(engine.stats().await.chunks, 0);
        assert!(engine.query("three").await.unwrap().is_empty());
    }
}
