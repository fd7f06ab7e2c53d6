// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod clip;
pub mod config;
pub mod vision;

// Re-export main types
pub use api::{ApiError, AppState, ErrorResponse};
pub use clip::{ClipModel, Device, EmbeddingBackend, EMBEDDING_DIMENSIONS, MAX_TEXT_TOKENS};
pub use config::NodeConfig;
