// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding post-processing
//!
//! Raw encoder outputs are rescaled to unit L2 norm before leaving the node,
//! so clients can compare any two embeddings with a dot product.

use anyhow::Result;

/// Rescales a raw feature vector to unit L2 norm.
///
/// A zero or non-finite norm is reported as an error rather than producing a
/// divide-by-zero: the encoders never emit a zero vector in practice, so a
/// zero norm means something upstream is broken and the request must fail.
pub fn l2_normalize(mut embedding: Vec<f32>) -> Result<Vec<f32>> {
    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm == 0.0 || !norm.is_finite() {
        anyhow::bail!("Cannot normalize embedding with norm {}", norm);
    }

    for value in &mut embedding {
        *value /= norm;
    }

    Ok(embedding)
}

/// Dot product of two vectors.
///
/// Equivalent to cosine similarity when both inputs are unit-normalized.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_normalize_produces_unit_norm() {
        let normalized = l2_normalize(vec![3.0, 4.0]).unwrap();
        assert!((norm(&normalized) - 1.0).abs() < 1e-6);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = l2_normalize(vec![0.5, -1.5, 2.0, 0.25]).unwrap();
        let twice = l2_normalize(once.clone()).unwrap();

        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_preserves_direction() {
        let normalized = l2_normalize(vec![-2.0, 0.0, 2.0]).unwrap();
        assert!(normalized[0] < 0.0);
        assert_eq!(normalized[1], 0.0);
        assert!(normalized[2] > 0.0);
    }

    #[test]
    fn test_normalize_zero_vector_is_error() {
        let result = l2_normalize(vec![0.0; 512]);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_nan_is_error() {
        let result = l2_normalize(vec![f32::NAN, 1.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_empty_vector_is_error() {
        // Empty input has norm 0
        let result = l2_normalize(vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cosine_similarity_identical_unit_vectors() {
        let v = l2_normalize(vec![1.0, 2.0, 3.0]).unwrap();
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }
}
