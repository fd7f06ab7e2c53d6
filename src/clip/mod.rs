// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! CLIP inference module
//!
//! This module provides:
//! - ONNX-backed text and image encoders sharing one 512-dimensional space
//! - Image preprocessing for the vision encoder (resize, crop, normalize)
//! - L2 normalization so downstream cosine similarity is a plain dot product

pub mod embedding;
pub mod model;
pub mod preprocessing;

pub use embedding::{cosine_similarity, l2_normalize};
pub use model::{ClipModel, Device, EmbeddingBackend, EMBEDDING_DIMENSIONS, MAX_TEXT_TOKENS};
pub use preprocessing::{preprocess_for_clip, CLIP_INPUT_SIZE};
