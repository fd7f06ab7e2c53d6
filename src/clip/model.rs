// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX CLIP Model Wrapper
//!
//! This module wraps ONNX Runtime sessions for the CLIP text and vision
//! encoders (clip-vit-base-patch32 export).
//!
//! Features:
//! - ONNX model loading from disk with GPU acceleration via CUDA
//!   (automatic CPU fallback)
//! - BPE tokenization with truncation/padding to the 77-token context
//! - Image encoding from a preprocessed [1, 3, 224, 224] tensor
//! - 512-dimensional output vectors on both paths

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{Array2, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{info, warn};

use crate::clip::preprocessing::preprocess_for_clip;
use crate::config::NodeConfig;

/// Output dimension of both encoders. A property of the deployed model,
/// not a tunable — reported in / metadata and enforced on every inference.
pub const EMBEDDING_DIMENSIONS: usize = 512;

/// Maximum text context length in tokens. Longer inputs are truncated,
/// shorter inputs are padded to this fixed shape.
pub const MAX_TEXT_TOKENS: usize = 77;

/// Compute device selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability the request handlers need from the model layer.
///
/// `ClipModel` is the production implementation; tests substitute a fake to
/// exercise the HTTP contract without model weights on disk.
pub trait EmbeddingBackend: Send + Sync {
    /// Encodes a text string into a raw (unnormalized) feature vector
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Encodes a decoded image into a raw (unnormalized) feature vector
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>>;

    /// Device the encoders run on
    fn device(&self) -> Device;

    /// Model identifier for status reporting
    fn model_name(&self) -> &str;

    /// Output dimension of both encoders
    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

/// ONNX-based CLIP model (text encoder + vision encoder + tokenizer)
///
/// Weights are read-only after load, so concurrent handlers share one
/// instance behind an `Arc`. Each session is mutex-guarded because
/// `Session::run` needs exclusive access; concurrent requests serialize
/// per encoder with no fairness guarantee.
pub struct ClipModel {
    /// ONNX Runtime session for the text encoder
    text_session: Mutex<Session>,

    /// ONNX Runtime session for the vision encoder
    image_session: Mutex<Session>,

    /// CLIP BPE tokenizer, configured for truncation/padding to 77 tokens
    tokenizer: Tokenizer,

    /// Device both sessions were committed on
    device: Device,

    /// Model identifier from configuration
    model_name: String,
}

impl fmt::Debug for ClipModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipModel")
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .field("dimension", &EMBEDDING_DIMENSIONS)
            .finish_non_exhaustive()
    }
}

impl ClipModel {
    /// Loads both encoders and the tokenizer from the configured model
    /// directory.
    ///
    /// # Errors
    /// Returns error if:
    /// - Any model artifact is missing
    /// - ONNX Runtime initialization fails on both CUDA and CPU
    /// - The tokenizer file is invalid
    /// - Either encoder fails the 512-dimension validation inference
    ///
    /// Any error here is fatal to startup: no partial state is published
    /// and there is no retry.
    pub fn load(config: &NodeConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Loading CLIP model '{}' from {}",
            config.model_name,
            config.model_dir.display()
        );

        // Device selection happens once, on the text encoder; the vision
        // encoder must land on the same device.
        let (text_session, device) = build_session_with_fallback(&config.text_model_path())?;
        let image_session = build_session(&config.image_model_path(), device)?;

        let mut tokenizer = Tokenizer::from_file(config.tokenizer_path())
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TEXT_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(MAX_TEXT_TOKENS),
            ..Default::default()
        }));

        let model = Self {
            text_session: Mutex::new(text_session),
            image_session: Mutex::new(image_session),
            tokenizer,
            device,
            model_name: config.model_name.clone(),
        };

        // Validation inference: both encoders must project into the same
        // 512-dimensional space or cross-modal similarity is meaningless.
        let text_probe = model.embed_text("validation probe")?;
        if text_probe.len() != EMBEDDING_DIMENSIONS {
            anyhow::bail!(
                "Text encoder outputs {} dimensions (expected {})",
                text_probe.len(),
                EMBEDDING_DIMENSIONS
            );
        }

        let image_probe = model.embed_image(&DynamicImage::new_rgb8(64, 64))?;
        if image_probe.len() != EMBEDDING_DIMENSIONS {
            anyhow::bail!(
                "Vision encoder outputs {} dimensions (expected {})",
                image_probe.len(),
                EMBEDDING_DIMENSIONS
            );
        }

        info!(
            "✅ CLIP model loaded on {} ({} dimensions)",
            device, EMBEDDING_DIMENSIONS
        );

        Ok(model)
    }

    /// Device both encoders run on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Model identifier
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Output dimension of both encoders
    pub fn dimension(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}

impl EmbeddingBackend for ClipModel {
    /// Generates a raw text embedding
    ///
    /// # Implementation
    /// 1. Tokenize with the CLIP BPE tokenizer (truncation + fixed padding
    ///    to 77 tokens — the encoder operates on fixed-shape tensors)
    /// 2. Run the text encoder session
    /// 3. Return the [1, 512] pooled output as a vector
    ///
    /// Empty strings are valid input; they tokenize to BOS/EOS plus padding.
    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();

        let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((1, seq_len), attention_mask)
            .context("Failed to create attention_mask array")?;

        // Lock the session for exclusive access during inference
        let mut session = self.text_session.lock().unwrap();
        let outputs = session.run(ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?
        ])?;

        extract_pooled_output(&outputs[0], "Text")
    }

    /// Generates a raw image embedding
    ///
    /// # Implementation
    /// 1. Preprocess to a [1, 3, 224, 224] CLIP-normalized tensor
    ///    (batch of exactly one, RGB coerced)
    /// 2. Run the vision encoder session
    /// 3. Return the [1, 512] pooled output as a vector
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let pixel_values = preprocess_for_clip(image);

        let mut session = self.image_session.lock().unwrap();
        let outputs = session.run(ort::inputs![
            "pixel_values" => Value::from_array(pixel_values)?
        ])?;

        extract_pooled_output(&outputs[0], "Vision")
    }

    fn device(&self) -> Device {
        self.device
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Extracts a [1, 512] pooled embedding from an encoder output.
///
/// Output index 0 is used instead of a name since different exports name the
/// projected output differently; the shape check catches a wrong export.
fn extract_pooled_output(output: &Value, encoder: &str) -> Result<Vec<f32>> {
    let array = output
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?;
    let shape = array.shape();

    if shape.len() != 2 || shape[0] != 1 || shape[1] != EMBEDDING_DIMENSIONS {
        anyhow::bail!(
            "{} encoder returned unexpected shape {:?} (expected [1, {}])",
            encoder,
            shape,
            EMBEDDING_DIMENSIONS
        );
    }

    Ok(array.index_axis(Axis(0), 0).iter().copied().collect())
}

/// Builds a session on the given device with Level3 graph optimization
fn build_session(path: &Path, device: Device) -> Result<Session> {
    let builder = Session::builder().context("Failed to create session builder")?;

    let builder = match device {
        Device::Cuda => builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?,
        Device::Cpu => builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?,
    };

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load ONNX model from {}", path.display()))
}

/// Tries CUDA first to detect whether a GPU is actually usable, then falls
/// back to CPU
fn build_session_with_fallback(path: &Path) -> Result<(Session, Device)> {
    info!("   Attempting CUDA execution provider...");
    match build_session(path, Device::Cuda) {
        Ok(session) => {
            info!("✅ CUDA execution provider initialized");
            Ok((session, Device::Cuda))
        }
        Err(e) => {
            warn!("⚠️  CUDA execution provider failed: {:#}", e);
            warn!("   Falling back to CPU execution provider");
            let session = build_session(path, Device::Cpu)?;
            Ok((session, Device::Cpu))
        }
    }
}
