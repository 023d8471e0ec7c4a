//! Integration tests for the retrieval engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use simsearch_embeddings::similarity::cosine_similarity;
use simsearch_embeddings::{
    ChunkOptions, Embedding, EmbeddingConfig, EmbeddingProvider, HashingProvider, SearchOptions,
    TokenChunkOptions,
};
use simsearch_retrieval::{ChunkingStrategy, RetrievalConfig, RetrievalEngine, RetrievalError};

/// Hashing provider that counts the texts it is asked to embed.
struct CountingProvider {
    inner: HashingProvider,
    texts: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            inner: HashingProvider::new(128).unwrap(),
            texts: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_batch(&self, texts: &[String]) -> simsearch_embeddings::Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

const HANDBOOK: &str = "\
Deployments happen every Tuesday after the release review.
Rollbacks are triggered automatically when error rates double.
The on-call engineer owns incident communication.
Deployments happen every Tuesday after the release review.
Database migrations must be backwards compatible for one release.
Feature flags default to off in production.";

fn config() -> RetrievalConfig {
    RetrievalConfig::default()
        .with_embedding(EmbeddingConfig::for_model("custom").with_dimensions(128).with_batch_size(2))
        .with_chunking(ChunkingStrategy::Separator(ChunkOptions::new(1, 0)))
}

#[tokio::test]
async fn ingest_embeds_in_batches_and_caches_repeats() {
    let provider = Arc::new(CountingProvider::new());
    let engine = RetrievalEngine::new(config(), Arc::clone(&provider)).unwrap();

    let report = engine.ingest("handbook", HANDBOOK).await.unwrap();
    assert_eq!(report.chunks, 6);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.stored, 5);

    // Five unique lines, batch size two.
    assert_eq!(provider.texts.load(Ordering::SeqCst), 5);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

    // Re-ingesting the same text hits the cache and stores nothing new.
    let again = engine.ingest("handbook-copy", HANDBOOK).await.unwrap();
    assert_eq!(again.stored, 0);
    assert_eq!(provider.texts.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn query_ranks_relevant_chunk_first() {
    let engine = RetrievalEngine::new(config(), HashingProvider::new(128).unwrap()).unwrap();
    engine.ingest("handbook", HANDBOOK).await.unwrap();

    let results = engine
        .query_with("when do deployments happen", &SearchOptions::new(3, 0.1))
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    assert_eq!(
        results[0].text.as_deref(),
        Some("Deployments happen every Tuesday after the release review.")
    );
    assert!(results.iter().all(|r| r.score >= 0.1));
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn stored_chunks_are_never_near_duplicates() {
    let threshold = 0.8;
    let engine = RetrievalEngine::new(
        config().with_dedup_threshold(Some(threshold)),
        HashingProvider::new(128).unwrap(),
    )
    .unwrap();
    engine.ingest("a", HANDBOOK).await.unwrap();
    engine
        .ingest("b", "Feature flags default to off in production!\nRollbacks are manual.")
        .await
        .unwrap();

    let provider = HashingProvider::new(128).unwrap();
    let results = engine
        .query_with("anything", &SearchOptions::new(100, -1.0))
        .await
        .unwrap();
    let vectors: Vec<Embedding> = results
        .iter()
        .map(|r| provider.embed_text(r.text.as_deref().unwrap_or_default()))
        .collect();

    for (i, a) in vectors.iter().enumerate() {
        for b in &vectors[i + 1..] {
            assert!(cosine_similarity(a, b).unwrap() < threshold);
        }
    }
}

#[tokio::test]
async fn token_chunking_strategy() {
    let engine = RetrievalEngine::new(
        config().with_chunking(ChunkingStrategy::Tokens(TokenChunkOptions::new(20, 2))),
        HashingProvider::new(128).unwrap(),
    )
    .unwrap();

    let report = engine.ingest("handbook", HANDBOOK).await.unwrap();
    assert!(report.chunks > 1);
    assert_eq!(engine.stats().await.chunks, report.stored);
}

#[tokio::test]
async fn invalid_configuration_is_rejected() {
    let result = RetrievalEngine::new(
        config().with_cache_max_entries(0),
        HashingProvider::default(),
    );
    assert!(matches!(result, Err(RetrievalError::Config(_))));

    let result = RetrievalEngine::new(
        config().with_chunking(ChunkingStrategy::Separator(ChunkOptions::new(0, 0))),
        HashingProvider::default(),
    );
    assert!(matches!(result, Err(RetrievalError::Embedding(_))));
}

#[tokio::test]
async fn load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("retrieval.toml");
    std::fs::write(
        &path,
        "dedup_threshold = 0.9\n\n[search]\ntop_k = 2\n\n[embedding]\ndimensions = 128\n",
    )
    .unwrap();

    let config = RetrievalConfig::load(&path).unwrap();
    assert_eq!(config.dedup_threshold, Some(0.9));

    let engine = RetrievalEngine::new(config, HashingProvider::new(128).unwrap()).unwrap();
    engine.ingest("handbook", HANDBOOK).await.unwrap();
    assert!(engine.query("feature flags").await.unwrap().len() <= 2);
}
