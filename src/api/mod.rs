// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod errors;
pub mod http_server;
pub mod state;

pub use embed::{
    embed_image_handler, embed_text_handler, EmbeddingResponse, ImageEmbedRequest,
    TextEmbedRequest,
};
pub use errors::{ApiError, ApiErrorResponse, ErrorResponse};
pub use http_server::{build_router, start_server, HealthResponse};
pub use state::AppState;
