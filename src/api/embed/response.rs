// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response type shared by both embedding endpoints

use serde::{Deserialize, Serialize};

/// Response body for POST /embed/text and POST /embed/image
///
/// The vector is unit L2-normalized, so the dot product of any two
/// responses is their cosine similarity. `dimensions` always equals the
/// vector length and matches the dimensionality advertised by GET /.
///
/// # Example
/// ```json
/// {"embedding": [0.1, 0.2, ...], "dimensions": 512}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Unit-normalized embedding vector
    pub embedding: Vec<f32>,

    /// Vector length (512 for clip-vit-base-patch32)
    pub dimensions: usize,
}

impl EmbeddingResponse {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            dimensions: embedding.len(),
            embedding,
        }
    }
}
