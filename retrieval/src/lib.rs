//! # Retrieval Engine
//!
//! This crate ties the embeddings building blocks into one engine:
//!
//! - **Chunking**: documents are split by paragraph or token window
//! - **Embedding**: chunks go through a batching client behind a FIFO cache
//! - **Deduplication**: near-duplicate chunks are dropped on ingest
//! - **Search**: queries are ranked against every stored chunk
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Retrieval Engine                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  document ──► ChunkingStrategy ──► CachedProvider               │
//! │                                        │                        │
//! │                                        ▼                        │
//! │                                 EmbeddingClient                 │
//! │                                 (batch, normalize)              │
//! │                                        │                        │
//! │                                        ▼                        │
//! │                 dedup ──────────► chunk store ◄──── query       │
//! │                                        │                        │
//! │                                        ▼                        │
//! │                                  search_similar                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use simsearch_embeddings::HashingProvider;
//! use simsearch_retrieval::RetrievalEngine;
//!
//! let engine = RetrievalEngine::<HashingProvider>::builder()
//!     .with_dedup_threshold(Some(0.95))
//!     .build(HashingProvider::default())?;
//!
//! engine.ingest("notes.md", &std::fs::read_to_string("notes.md")?).await?;
//! let results = engine.query("What did we decide about caching?").await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::{ChunkingStrategy, RetrievalConfig};
pub use engine::{ChunkSource, EngineStats, IngestReport, RetrievalEngine, RetrievalEngineBuilder};
pub use error::{Result, RetrievalError};

// Re-export from dependencies for convenience
pub use simsearch_embeddings::{EmbeddingConfig, EmbeddingProvider, SearchOptions, SearchResult};
