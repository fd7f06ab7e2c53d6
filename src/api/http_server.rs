// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP server wiring: routes, status endpoints and the serve loop

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use super::embed::{embed_image_handler, embed_text_handler};
use super::state::AppState;
use crate::clip::EMBEDDING_DIMENSIONS;

/// Response body for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" once the model is loaded, "unhealthy" before
    pub status: String,
    pub model_loaded: bool,
    /// "cuda", "cpu", or "unknown" before load
    pub device: String,
    pub model_name: String,
}

/// Builds the application router. Separated from the serve loop so tests
/// can drive the full HTTP surface in-process.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Service metadata
        .route("/", get(root_handler))
        // Health check
        .route("/health", get(health_handler))
        // Embedding endpoints
        .route("/embed/text", post(embed_text_handler))
        .route("/embed/image", post(embed_image_handler))
        // Static usage examples
        .route("/test", get(test_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Binds the listener and serves until the process terminates.
///
/// Called only after the model has been published: initialization
/// happens-before all serving.
pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// GET / — service metadata.
///
/// The advertised dimensionality is the same constant the encoders are
/// validated against, so it always matches actual embedding responses.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": "CLIP Embedding Node",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config().model_name,
        "dimensions": EMBEDDING_DIMENSIONS,
        "endpoints": {
            "health": "GET /health",
            "embed_text": "POST /embed/text",
            "embed_image": "POST /embed/image"
        },
        "examples": "/test"
    }))
}

/// GET /health — readiness-derived health view
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let ready = state.is_ready();
    let status = if ready { "healthy" } else { "unhealthy" };

    Json(HealthResponse {
        status: status.to_string(),
        model_loaded: ready,
        device: state.device_label().to_string(),
        model_name: state.config().model_name.clone(),
    })
}

/// GET /test — static usage examples
async fn test_handler() -> impl IntoResponse {
    Json(json!({
        "message": "POST a JSON body to either embedding endpoint",
        "example_text": {
            "endpoint": "/embed/text",
            "method": "POST",
            "body": {"text": "a photo of a dog"}
        },
        "example_image": {
            "endpoint": "/embed/image",
            "method": "POST",
            "body": {"image": "base64_encoded_image_data", "mime_type": "image/jpeg"}
        }
    }))
}
