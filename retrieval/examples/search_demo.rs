//! Demo: ingest a few documents and run queries against them.
//!
//! Run with: cargo run -p simsearch-retrieval --example search_demo

use simsearch_embeddings::{ChunkOptions, EmbeddingConfig, HashingProvider, SearchOptions};
use simsearch_retrieval::{ChunkingStrategy, RetrievalEngine};

const DOCUMENTS: &[(&str, &str)] = &[
    (
        "ops.md",
        "Deployments happen every Tuesday after the release review.\n\
         Rollbacks are triggered automatically when error rates double.\n\
         The on-call engineer owns incident communication.",
    ),
    (
        "db.md",
        "Database migrations must be backwards compatible for one release.\n\
         Schema changes are reviewed by the data team.\n\
         Deployments happen every Tuesday after the release review.",
    ),
    (
        "flags.md",
        "Feature flags default to off in production.\n\
         Stale flags are removed after two releases.",
    ),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Similarity Search Demo ===\n");

    let engine = RetrievalEngine::<HashingProvider>::builder()
        .with_embedding(EmbeddingConfig::for_model("all-MiniLM-L6-v2").with_batch_size(4))
        .with_chunking(ChunkingStrategy::Separator(ChunkOptions::new(80, 0)))
        .with_dedup_threshold(Some(0.95))
        .build(HashingProvider::default())?;

    for (id, text) in DOCUMENTS {
        let report = engine.ingest(id, text).await?;
        println!(
            "Ingested {id}: {} chunks, {} stored, {} duplicates",
            report.chunks, report.stored, report.duplicates
        );
    }

    for query in [
        "when do deployments happen",
        "who handles incidents",
        "are feature flags on by default",
    ] {
        println!("\nQuery: {query}");
        let results = engine.query_with(query, &SearchOptions::new(2, 0.05)).await?;
        if results.is_empty() {
            println!("  (no results)");
        }
        for result in results {
            println!(
                "  {:.3}  {}  {}",
                result.score,
                result.text.unwrap_or_default(),
                result.metadata.unwrap_or_default()
            );
        }
    }

    let stats = engine.stats().await;
    println!(
        "\n{} documents, {} chunks, cache {}/{} ({} hits, {} misses)",
        stats.documents,
        stats.chunks,
        stats.cache.entries,
        stats.cache.max_entries,
        stats.cache.hits,
        stats.cache.misses
    );

    Ok(())
}
