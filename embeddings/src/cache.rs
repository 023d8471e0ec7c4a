//! Bounded embedding cache.
//!
//! Entries are keyed by the full input text, so distinct texts never share a
//! slot. When the cache is full the oldest inserted entry is evicted (FIFO);
//! lookups do not refresh an entry's position, so this is not an LRU.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;

/// Default maximum number of cached embeddings.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Default)]
struct CacheState {
    /// Entries in insertion order.
    entries: IndexMap<String, Embedding>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Cache for embeddings to avoid recomputing them.
///
/// All methods take `&self`; a single mutex guards the entries and counters,
/// so the cache can be shared across threads behind an `Arc`.
///
/// Compute functions passed to [`EmbeddingCache::get_or_compute`] run outside
/// the lock. Two callers missing on the same text at the same time may both
/// compute it; the second insert overwrites the first without evicting.
pub struct EmbeddingCache {
    state: Mutex<CacheState>,

    /// Maximum cache size.
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create a cache holding at most `max_entries` embeddings.
    pub fn new(max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(EmbeddingError::InvalidConfiguration(
                "cache max_entries must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            state: Mutex::new(CacheState::default()),
            max_entries,
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get an embedding from the cache.
    pub fn get(&self, text: &str) -> Option<Embedding> {
        let mut state = self.lock();
        let found = state.entries.get(text).cloned();
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        found
    }

    /// Put an embedding in the cache.
    ///
    /// Replacing an existing text keeps its original position and evicts
    /// nothing. Otherwise, at capacity, the oldest entry is evicted first.
    pub fn set(&self, text: &str, embedding: Embedding) {
        let mut state = self.lock();

        if let Some(existing) = state.entries.get_mut(text) {
            *existing = embedding;
            return;
        }

        if state.entries.len() >= self.max_entries
            && state.entries.shift_remove_index(0).is_some()
        {
            state.evictions += 1;
            debug!("Evicted oldest cached embedding");
        }

        state.entries.insert(text.to_string(), embedding);
    }

    /// Return the cached embedding for `text`, computing and caching it on a miss.
    pub fn get_or_compute<F>(&self, text: &str, compute: F) -> Embedding
    where
        F: FnOnce(&str) -> Embedding,
    {
        if let Some(embedding) = self.get(text) {
            return embedding;
        }

        let embedding = compute(text);
        self.set(text, embedding.clone());
        embedding
    }

    /// Like [`EmbeddingCache::get_or_compute`] for a fallible compute function.
    /// Nothing is cached when it fails.
    pub fn try_get_or_compute<F, E>(
        &self,
        text: &str,
        compute: F,
    ) -> std::result::Result<Embedding, E>
    where
        F: FnOnce(&str) -> std::result::Result<Embedding, E>,
    {
        if let Some(embedding) = self.get(text) {
            return Ok(embedding);
        }

        let embedding = compute(text)?;
        self.set(text, embedding.clone());
        Ok(embedding)
    }

    /// Check if an embedding is cached. Does not count as a hit or miss.
    pub fn contains(&self, text: &str) -> bool {
        self.lock().entries.contains_key(text)
    }

    /// Number of cached embeddings.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Clear the entire cache. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
        info!("Cleared embedding cache");
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            max_entries: self.max_entries,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of entries in cache.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,

    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// A provider wrapper that serves repeated texts from an [`EmbeddingCache`].
pub struct CachedProvider<P> {
    provider: P,
    cache: EmbeddingCache,
}

impl<P> CachedProvider<P>
where
    P: EmbeddingProvider,
{
    /// Create a new cached provider.
    pub fn new(provider: P, cache: EmbeddingCache) -> Self {
        Self { provider, cache }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> EmbeddingProvider for CachedProvider<P>
where
    P: EmbeddingProvider,
{
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed only the texts missing from the cache, in a single provider call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let cached: Vec<Option<Embedding>> = texts.iter().map(|t| self.cache.get(t)).collect();

        let missing: IndexSet<String> = texts
            .iter()
            .zip(&cached)
            .filter(|(_, hit)| hit.is_none())
            .map(|(text, _)| text.clone())
            .collect();

        let fresh = if missing.is_empty() {
            Vec::new()
        } else {
            let missing_texts: Vec<String> = missing.iter().cloned().collect();
            debug!(
                "Cache miss for {} of {} texts",
                missing_texts.len(),
                texts.len()
            );
            let vectors = self.provider.embed_batch(&missing_texts).await?;
            if vectors.len() != missing_texts.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "provider returned {} embeddings for {} texts",
                    vectors.len(),
                    missing_texts.len()
                )));
            }
            for (text, vector) in missing_texts.iter().zip(&vectors) {
                self.cache.set(text, vector.clone());
            }
            vectors
        };

        let mut embeddings = Vec::with_capacity(texts.len());
        for (text, hit) in texts.iter().zip(cached) {
            match hit {
                Some(embedding) => embeddings.push(embedding),
                None => {
                    let index = missing.get_index_of(text).ok_or_else(|| {
                        EmbeddingError::InvalidResponse("missing embedding".to_string())
                    })?;
                    embeddings.push(fresh[index].clone());
                }
            }
        }

        Ok(embeddings)
    }
}
