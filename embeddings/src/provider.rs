//! Embedding providers.
//!
//! A provider is anything that turns a batch of texts into vectors. Network
//! clients live outside this crate; [`HashingProvider`] is a deterministic
//! offline provider, and [`EmbeddingClient`] adds batching and normalization
//! on top of any provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Embedding;
use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize_in_place;

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Dimension of the vectors this provider returns.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, returning one vector per text in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match (vectors.pop(), vectors.is_empty()) {
            (Some(vector), true) => Ok(vector),
            _ => Err(EmbeddingError::InvalidResponse(
                "expected exactly one embedding".to_string(),
            )),
        }
    }
}

#[async_trait]
impl<P> EmbeddingProvider for Arc<P>
where
    P: EmbeddingProvider + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        (**self).embed_batch(texts).await
    }
}

/// Batching, normalizing front end for a provider.
///
/// Inputs are split into groups of at most `batch_size` texts, each group is
/// sent to the provider, and the results are concatenated in order. When the
/// config asks for it, every vector is L2-normalized afterwards.
pub struct EmbeddingClient<P> {
    provider: P,
    config: EmbeddingConfig,
}

impl<P> EmbeddingClient<P>
where
    P: EmbeddingProvider,
{
    /// Create a new client. Fails if the config is invalid.
    ///
    /// The provider's own dimension wins over `config.dimensions`.
    pub fn new(provider: P, config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;
        if provider.dimension() != config.dimensions {
            warn!(
                "Provider {} emits {}-dimensional vectors, config says {}",
                provider.name(),
                provider.dimension(),
                config.dimensions
            );
        }
        Ok(Self { provider, config })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Embed any number of texts.
    pub async fn embed_all(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size) {
            debug!(
                "Embedding batch of {} texts with {}",
                batch.len(),
                self.provider.name()
            );
            let vectors = self.provider.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::InvalidResponse(format!(
                    "provider returned {} embeddings for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);
        }

        if self.config.normalize {
            for embedding in &mut embeddings {
                normalize_in_place(embedding);
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl<P> EmbeddingProvider for EmbeddingClient<P>
where
    P: EmbeddingProvider,
{
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.embed_all(texts).await
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic feature-hashing embedder.
///
/// Each lowercase alphanumeric token is hashed with FNV-1a; the hash picks a
/// bucket and the top bit picks a sign. Texts sharing words end up with
/// similar vectors. No model or network access is needed.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Create a provider producing vectors of the given dimension.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidConfiguration(
                "dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Embed one text without going through the async trait.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        vector
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self { dimension: 384 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
