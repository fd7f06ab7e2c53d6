// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end inference tests against the real ONNX export.
//!
//! All tests are ignored by default and require the model artifacts
//! (text_model.onnx, visual_model.onnx, tokenizer.json) under MODEL_DIR.
//! Run with: cargo test --test clip_e2e -- --ignored

use clap::Parser;
use clip_embed_node::clip::{cosine_similarity, l2_normalize, ClipModel, EmbeddingBackend};
use clip_embed_node::config::NodeConfig;
use image::DynamicImage;

const MODEL_DIR: &str = "./models/clip-vit-base-patch32";

fn load_model() -> ClipModel {
    let config = NodeConfig::parse_from(["clip-embed-node", "--model-dir", MODEL_DIR]);
    ClipModel::load(&config).expect("model artifacts must be present under MODEL_DIR")
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[test]
#[ignore] // Only run if model files are downloaded
fn test_text_embedding_dimensions_and_norm() {
    let model = load_model();

    let raw = model.embed_text("a photo of a dog").unwrap();
    assert_eq!(raw.len(), 512);

    let embedding = l2_normalize(raw).unwrap();
    assert!((norm(&embedding) - 1.0).abs() < 1e-4);
}

#[test]
#[ignore] // Only run if model files are downloaded
fn test_empty_text_embeds() {
    let model = load_model();
    let raw = model.embed_text("").unwrap();
    assert_eq!(raw.len(), 512);
}

#[test]
#[ignore] // Only run if model files are downloaded
fn test_long_text_truncates_to_context() {
    let model = load_model();
    let long_text = "a photo of a dog ".repeat(200);
    let raw = model.embed_text(&long_text).unwrap();
    assert_eq!(raw.len(), 512);
}

#[test]
#[ignore] // Only run if model files are downloaded
fn test_text_embedding_is_deterministic() {
    let model = load_model();

    let first = model.embed_text("a photo of a cat").unwrap();
    let second = model.embed_text("a photo of a cat").unwrap();

    for (a, b) in first.iter().zip(second.iter()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
#[ignore] // Only run if model files are downloaded
fn test_image_embedding_dimensions_and_norm() {
    let model = load_model();

    let image = DynamicImage::new_rgb8(640, 480);
    let raw = model.embed_image(&image).unwrap();
    assert_eq!(raw.len(), 512);

    let embedding = l2_normalize(raw).unwrap();
    assert!((norm(&embedding) - 1.0).abs() < 1e-4);
}

#[test]
#[ignore] // Only run if model files are downloaded
fn test_rgba_image_embeds_after_channel_coercion() {
    let model = load_model();
    let image = DynamicImage::new_rgba8(320, 240);
    let raw = model.embed_image(&image).unwrap();
    assert_eq!(raw.len(), 512);
}

#[test]
#[ignore] // Requires model files and CLIP_TEST_CAT_IMAGE pointing at a cat photo
fn test_cross_modal_similarity_ordering() {
    let model = load_model();

    let image_path =
        std::env::var("CLIP_TEST_CAT_IMAGE").expect("set CLIP_TEST_CAT_IMAGE to a cat photo");
    let image = image::open(image_path).unwrap();

    let image_embedding = l2_normalize(model.embed_image(&image).unwrap()).unwrap();
    let cat_text = l2_normalize(model.embed_text("a photo of a cat").unwrap()).unwrap();
    let truck_text = l2_normalize(model.embed_text("a photo of a truck").unwrap()).unwrap();

    let cat_score = cosine_similarity(&image_embedding, &cat_text);
    let truck_score = cosine_similarity(&image_embedding, &truck_text);

    assert!(
        cat_score > truck_score + 0.05,
        "expected cat similarity ({}) to clearly beat truck similarity ({})",
        cat_score,
        truck_score
    );
}
