// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API Module
//!
//! This module provides the POST /embed/text and POST /embed/image
//! endpoints for generating 512-dimensional CLIP embeddings.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{embed_image_handler, embed_text_handler};
pub use request::{ImageEmbedRequest, TextEmbedRequest};
pub use response::EmbeddingResponse;
