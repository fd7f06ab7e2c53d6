// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed/text and POST /embed/image HTTP handlers
//!
//! Both handlers follow the same shape: readiness guard, then the blocking
//! inference dispatched onto the tokio blocking pool (encoder invocation is
//! CPU/GPU-bound with no suspension points, and must not stall the
//! cooperative scheduler), then unit normalization.
//!
//! Failure mapping:
//! - model not published yet        -> 503 service_unavailable
//! - undecodable image payload      -> 400 invalid_request
//! - tokenizer/encoder failure      -> 500 internal_error
//! All failures are recovered here and converted into structured error
//! responses; none crash the serving process.

use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::embed::{EmbeddingResponse, ImageEmbedRequest, TextEmbedRequest};
use crate::api::errors::{ApiError, ApiErrorResponse};
use crate::api::state::AppState;
use crate::clip::{l2_normalize, EmbeddingBackend};
use crate::vision::image_utils::{decode_base64_image, format_from_mime};

/// POST /embed/text handler
///
/// Generates a unit-normalized 512-dimensional embedding for one text
/// string. Empty input is valid.
pub async fn embed_text_handler(
    State(state): State<AppState>,
    Json(request): Json<TextEmbedRequest>,
) -> Result<Json<EmbeddingResponse>, ApiErrorResponse> {
    let model = require_model(&state)?;

    let preview: String = request.text.chars().take(50).collect();
    info!("[TEXT] Embedding: '{}'", preview);

    let raw = run_inference(move || {
        model.embed_text(&request.text).map_err(|e| {
            error!("[TEXT] ❌ Embedding generation failed: {:#}", e);
            ApiError::InternalError(format!("Embedding generation failed: {}", e))
        })
    })
    .await?;
    let embedding = normalize(raw, "TEXT")?;

    info!("[TEXT] ✅ Generated {}D embedding", embedding.len());
    Ok(Json(EmbeddingResponse::new(embedding)))
}

/// POST /embed/image handler
///
/// Decodes a base64 image payload and generates a unit-normalized
/// 512-dimensional embedding. Decode failures are the client's fault (400);
/// encoder failures are ours (500).
pub async fn embed_image_handler(
    State(state): State<AppState>,
    Json(request): Json<ImageEmbedRequest>,
) -> Result<Json<EmbeddingResponse>, ApiErrorResponse> {
    let model = require_model(&state)?;

    info!(
        "[IMAGE] Processing image (~{}KB base64)",
        request.image.len() / 1024
    );

    // Decode and inference both run off the async scheduler; the decode can
    // chew through multi-megabyte payloads.
    let raw = run_inference(move || {
        let (image, format) = decode_base64_image(&request.image).map_err(|e| {
            warn!("[IMAGE] Rejected payload: {}", e);
            ApiError::InvalidRequest(format!("Invalid image data: {}", e))
        })?;

        match format_from_mime(&request.mime_type) {
            Some(declared) if declared != format => {
                warn!(
                    "[IMAGE] Declared MIME type {} but bytes are {:?}; using sniffed format",
                    request.mime_type, format
                );
            }
            _ => {}
        }

        info!(
            "[IMAGE] Decoded {}x{} {:?} image",
            image.width(),
            image.height(),
            format
        );

        model.embed_image(&image).map_err(|e| {
            error!("[IMAGE] ❌ Embedding generation failed: {:#}", e);
            ApiError::InternalError(format!("Embedding generation failed: {}", e))
        })
    })
    .await?;

    let embedding = normalize(raw, "IMAGE")?;

    info!("[IMAGE] ✅ Generated {}D embedding", embedding.len());
    Ok(Json(EmbeddingResponse::new(embedding)))
}

/// Readiness guard: a handler must never touch an unpublished model
fn require_model(state: &AppState) -> Result<Arc<dyn EmbeddingBackend>, ApiError> {
    state.model().ok_or_else(|| {
        warn!("Request rejected: model not loaded");
        ApiError::ServiceUnavailable("Model not loaded".to_string())
    })
}

/// Dispatches blocking encoder work onto the tokio blocking pool.
///
/// The closure's own error mapping is preserved; only a panicked or
/// cancelled worker becomes a fresh InternalError here.
async fn run_inference<F, T>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::InternalError(format!("Inference task failed: {}", e)))?
}

fn normalize(raw: Vec<f32>, tag: &str) -> Result<Vec<f32>, ApiError> {
    l2_normalize(raw).map_err(|e| {
        error!("[{}] ❌ {:#}", tag, e);
        ApiError::InternalError(e.to_string())
    })
}
