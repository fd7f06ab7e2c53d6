// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use clip_embed_node::{
    api::{http_server, AppState},
    clip::ClipModel,
    config::NodeConfig,
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = NodeConfig::parse();

    println!("🚀 Starting CLIP Embedding Node v{}\n", env!("CARGO_PKG_VERSION"));
    println!("🧠 Model: {}", config.model_name);
    println!("📦 Model directory: {}", config.model_dir.display());
    println!();

    let state = AppState::new(config.clone());

    // A load failure is fatal: the process must never reach the serving
    // loop without a published model, and there is no retry.
    let model = ClipModel::load(&config)?;
    state.publish(Arc::new(model))?;

    println!("✅ Model loaded, starting API server\n");

    let addr = config.socket_addr()?;
    http_server::start_server(state, addr).await
}
