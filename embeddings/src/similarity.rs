//! Vector math over embeddings.
//!
//! All pairwise operations require operands of the same dimension and fail
//! with [`EmbeddingError::DimensionMismatch`] otherwise.

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Norms below this value are clamped before dividing.
pub const NORM_EPSILON: f32 = 1e-10;

/// L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Normalize a single vector to unit length in place.
///
/// The divisor is `max(norm, NORM_EPSILON)`, so a zero vector stays zero and
/// a near-zero vector is scaled up but never turns into NaN.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v).max(NORM_EPSILON);
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// L2-normalize every vector in a collection.
pub fn normalize(vectors: &[Embedding]) -> Vec<Embedding> {
    vectors
        .iter()
        .map(|v| {
            let mut v = v.clone();
            normalize_in_place(&mut v);
            v
        })
        .collect()
}

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors
/// - -1.0 means opposite vectors
///
/// If either vector has zero magnitude the similarity is defined as `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    EmbeddingError::check_dimensions(a, b)?;

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a = l2_norm(a);
    let magnitude_b = l2_norm(b);

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// Score a query against every candidate.
///
/// Each candidate and the query are normalized independently, then the query
/// is dotted with each candidate. One score per candidate, in input order.
pub fn cosine_similarity_matrix(candidates: &[Embedding], query: &[f32]) -> Result<Vec<f32>> {
    let mut query = query.to_vec();
    normalize_in_place(&mut query);

    candidates
        .iter()
        .map(|candidate| {
            EmbeddingError::check_dimensions(&query, candidate)?;
            let norm = l2_norm(candidate).max(NORM_EPSILON);
            Ok(candidate
                .iter()
                .zip(query.iter())
                .map(|(c, q)| (c / norm) * q)
                .sum())
        })
        .collect()
}

/// Compute the euclidean distance between two embeddings.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    EmbeddingError::check_dimensions(a, b)?;

    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();

    Ok(sum.sqrt())
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    EmbeddingError::check_dimensions(a, b)?;

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}
