//! Brute-force top-K similarity search.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::cosine_similarity_matrix;

/// A similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Index into the candidate collection.
    pub index: usize,

    /// Similarity score.
    pub score: f32,

    /// The candidate's original text, when texts were supplied.
    pub text: Option<String>,

    /// Additional metadata.
    pub metadata: Option<serde_json::Value>,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(index: usize, score: f32) -> Self {
        Self {
            index,
            score,
            text: None,
            metadata: None,
        }
    }

    /// Attach the candidate text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Add metadata to the result.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Parameters for a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum number of results.
    pub top_k: usize,

    /// Minimum score a result must reach.
    pub threshold: f32,
}

impl SearchOptions {
    pub fn new(top_k: usize, threshold: f32) -> Self {
        Self { top_k, threshold }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 0.0,
        }
    }
}

/// Find the `top_k` candidates most similar to `query`.
///
/// Candidates are ranked by cosine similarity, highest first, with ties kept
/// in ascending index order. The threshold is applied after the top-K cut, so
/// fewer than `top_k` results may come back.
pub fn search_similar(
    query: &[f32],
    candidates: &[Embedding],
    texts: Option<&[String]>,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    let ranked = rank(query, candidates, texts.map(<[String]>::len), options)?;

    Ok(ranked
        .into_iter()
        .map(|(index, score)| {
            let result = SearchResult::new(index, score);
            match texts {
                Some(texts) => result.with_text(texts[index].clone()),
                None => result,
            }
        })
        .collect())
}

/// Like [`search_similar`], also attaching a parallel metadata entry to each result.
pub fn search_similar_with_metadata(
    query: &[f32],
    candidates: &[Embedding],
    texts: Option<&[String]>,
    metadata: &[serde_json::Value],
    options: &SearchOptions,
) -> Result<Vec<SearchResult>> {
    if metadata.len() != candidates.len() {
        return Err(EmbeddingError::MetadataCountMismatch {
            candidates: candidates.len(),
            metadata: metadata.len(),
        });
    }

    let mut results = search_similar(query, candidates, texts, options)?;
    for result in &mut results {
        result.metadata = Some(metadata[result.index].clone());
    }
    Ok(results)
}

fn rank(
    query: &[f32],
    candidates: &[Embedding],
    text_count: Option<usize>,
    options: &SearchOptions,
) -> Result<Vec<(usize, f32)>> {
    match text_count {
        Some(texts) if texts != candidates.len() => {
            return Err(EmbeddingError::TextCountMismatch {
                candidates: candidates.len(),
                texts,
            });
        }
        _ => {}
    }

    let scores = cosine_similarity_matrix(candidates, query)?;

    // NaN scores never pass a threshold, so they must not take a top-K slot.
    let mut order: Vec<(usize, OrderedFloat<f32>)> = scores
        .into_iter()
        .map(OrderedFloat)
        .enumerate()
        .filter(|(_, score)| !score.0.is_nan())
        .collect();

    // Stable: equal scores keep ascending index order.
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.truncate(options.top_k);

    Ok(order
        .into_iter()
        .filter(|(_, score)| score.0 >= options.threshold)
        .map(|(index, score)| (index, score.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidates() -> Vec<Embedding> {
        vec![
            vec![1.0, 0.0, 0.0], // similarity 1.0
            vec![0.0, 1.0, 0.0], // similarity 0.0
            vec![0.7, 0.7, 0.0], // similarity ~0.707
        ]
    }

    #[test]
    fn test_search_top_k() {
        let results =
            search_similar(&[1.0, 0.0, 0.0], &candidates(), None, &SearchOptions::new(2, 0.0))
                .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0);
        assert_eq!(results[1].index, 2);
        assert!(results[0].text.is_none());
    }

    #[test]
    fn test_threshold_applies_after_top_k() {
        let results =
            search_similar(&[1.0, 0.0, 0.0], &candidates(), None, &SearchOptions::new(3, 0.8))
                .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 0);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let candidates = vec![vec![0.0, 1.0], vec![2.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0]];
        let results =
            search_similar(&[1.0, 0.0], &candidates, None, &SearchOptions::new(3, 0.5)).unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_texts_attached() {
        let texts: Vec<String> = ["alpha", "beta", "gamma"].map(String::from).to_vec();
        let results = search_similar(
            &[0.0, 1.0, 0.0],
            &candidates(),
            Some(texts.as_slice()),
            &SearchOptions::new(1, 0.0),
        )
        .unwrap();
        assert_eq!(results[0].text.as_deref(), Some("beta"));
    }

    #[test]
    fn test_text_count_mismatch() {
        let texts = vec!["only one".to_string()];
        let result = search_similar(
            &[1.0, 0.0, 0.0],
            &candidates(),
            Some(texts.as_slice()),
            &SearchOptions::default(),
        );
        assert!(matches!(
            result,
            Err(EmbeddingError::TextCountMismatch {
                candidates: 3,
                texts: 1
            })
        ));
    }

    #[test]
    fn test_metadata_attached() {
        let metadata = vec![
            serde_json::json!({"id": "a"}),
            serde_json::json!({"id": "b"}),
            serde_json::json!({"id": "c"}),
        ];
        let results = search_similar_with_metadata(
            &[1.0, 0.0, 0.0],
            &candidates(),
            None,
            &metadata,
            &SearchOptions::new(1, 0.0),
        )
        .unwrap();
        assert_eq!(results[0].metadata, Some(serde_json::json!({"id": "a"})));
    }

    #[test]
    fn test_metadata_count_mismatch() {
        let metadata = vec![serde_json::json!({"id": "a"})];
        let result = search_similar_with_metadata(
            &[1.0, 0.0, 0.0],
            &candidates(),
            None,
            &metadata,
            &SearchOptions::default(),
        );
        assert!(matches!(
            result,
            Err(EmbeddingError::MetadataCountMismatch {
                candidates: 3,
                metadata: 1
            })
        ));
    }

    #[test]
    fn test_nan_scores_do_not_take_top_k_slots() {
        let candidates = vec![
            vec![f32::INFINITY, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let results =
            search_similar(&[1.0, 0.0], &candidates, None, &SearchOptions::new(2, -1.0)).unwrap();
        let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_zero_top_k_and_empty_candidates() {
        let none = search_similar(
            &[1.0, 0.0, 0.0],
            &candidates(),
            None,
            &SearchOptions::new(0, 0.0),
        )
        .unwrap();
        assert!(none.is_empty());

        let empty = search_similar(&[1.0], &[], None, &SearchOptions::default()).unwrap();
        assert!(empty.is_empty());
    }
}
