//! Near-duplicate elimination by cosine similarity.

use crate::Embedding;
use crate::error::Result;
use crate::similarity::cosine_similarity;

/// Default similarity at or above which two vectors count as duplicates.
pub const DEFAULT_DEDUP_THRESHOLD: f32 = 0.95;

/// Return the indices of a near-duplicate-free subset of `vectors`.
///
/// Vectors are visited in order and each one is compared against every vector
/// kept so far; it is dropped if any similarity is `>= threshold`. The first
/// occurrence always wins.
///
/// This is O(n²) comparisons in the worst case. There is no index behind it;
/// collections large enough for that to matter need a different approach.
pub fn deduplicate_by_similarity(vectors: &[Embedding], threshold: f32) -> Result<Vec<usize>> {
    let mut kept: Vec<usize> = Vec::new();

    for (i, vector) in vectors.iter().enumerate() {
        let mut is_duplicate = false;
        for &j in &kept {
            if cosine_similarity(vector, &vectors[j])? >= threshold {
                is_duplicate = true;
                break;
            }
        }

        if !is_duplicate {
            kept.push(i);
        }
    }

    Ok(kept)
}
