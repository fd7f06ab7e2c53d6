// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Node configuration
//!
//! All values come from CLI flags or environment variables at startup. The
//! model identifier is configuration, not a hardcoded constant, so a future
//! CLIP variant can be deployed without a code change — but each process
//! serves exactly one model for its whole lifetime.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the CLIP embedding node
#[derive(Parser, Debug, Clone)]
#[command(name = "clip-embed-node", version, about = "CLIP embedding inference node")]
pub struct NodeConfig {
    /// Directory containing text_model.onnx, visual_model.onnx and tokenizer.json
    #[arg(long, env = "CLIP_MODEL_DIR", default_value = "./models/clip-vit-base-patch32")]
    pub model_dir: PathBuf,

    /// Model identifier reported in / and /health responses
    #[arg(long, env = "CLIP_MODEL_NAME", default_value = "clip-vit-base-patch32")]
    pub model_name: String,

    /// Address to bind the HTTP server to
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "API_PORT", default_value_t = 7860)]
    pub port: u16,
}

impl NodeConfig {
    /// Path to the ONNX text encoder
    pub fn text_model_path(&self) -> PathBuf {
        self.model_dir.join("text_model.onnx")
    }

    /// Path to the ONNX vision encoder
    pub fn image_model_path(&self) -> PathBuf {
        self.model_dir.join("visual_model.onnx")
    }

    /// Path to the tokenizer definition
    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join("tokenizer.json")
    }

    /// Checks that all model artifacts exist before any load is attempted
    pub fn validate(&self) -> Result<()> {
        for path in [
            self.text_model_path(),
            self.image_model_path(),
            self.tokenizer_path(),
        ] {
            if !path.exists() {
                anyhow::bail!("Model artifact not found: {}", path.display());
            }
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}
