// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the CLIP vision encoder

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Target size for the CLIP vision encoder (ViT-B/32)
pub const CLIP_INPUT_SIZE: u32 = 224;

/// CLIP normalization mean values
pub const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];

/// CLIP normalization std values
pub const STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Preprocess an image for the CLIP vision encoder
///
/// Steps:
/// 1. Resize to cover CLIP_INPUT_SIZE, then center crop (no distortion)
/// 2. Convert to RGB — palette, grayscale and alpha sources are all coerced
///    to a 3-channel layout, which the encoder requires
/// 3. Normalize with CLIP mean/std: (pixel/255 - mean) / std
/// 4. Convert to NCHW tensor format [1, 3, H, W] — a batch of exactly one
pub fn preprocess_for_clip(image: &DynamicImage) -> Array4<f32> {
    let resized = center_crop_resize(image, CLIP_INPUT_SIZE);
    let rgb = resized.to_rgb8();

    let size = CLIP_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let pixel = rgb.get_pixel(x as u32, y as u32);

            for c in 0..3 {
                let normalized = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
                tensor[[0, c, y, x]] = normalized;
            }
        }
    }

    tensor
}

/// Resize to cover the target square, then crop the center
fn center_crop_resize(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let (orig_w, orig_h) = image.dimensions();

    // Degenerate dimensions produce a flat gray canvas instead of panicking
    if orig_w == 0 || orig_h == 0 {
        return DynamicImage::ImageRgb8(RgbImage::from_pixel(
            target_size,
            target_size,
            Rgb([128, 128, 128]),
        ));
    }

    let scale_w = target_size as f32 / orig_w as f32;
    let scale_h = target_size as f32 / orig_h as f32;
    let scale = scale_w.max(scale_h);

    let new_w = (orig_w as f32 * scale).round() as u32;
    let new_h = (orig_h as f32 * scale).round() as u32;

    let resized = image.resize_exact(new_w, new_h, image::imageops::FilterType::Lanczos3);

    let crop_x = (new_w.saturating_sub(target_size)) / 2;
    let crop_y = (new_h.saturating_sub(target_size)) / 2;

    resized.crop_imm(crop_x, crop_y, target_size, target_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(CLIP_INPUT_SIZE, 224);
        assert_eq!(MEAN.len(), 3);
        assert_eq!(STD.len(), 3);
    }

    #[test]
    fn test_preprocess_shape_square() {
        let img = DynamicImage::new_rgb8(100, 100);
        let tensor = preprocess_for_clip(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_shape_rectangular() {
        let img = DynamicImage::new_rgb8(1920, 1080);
        let tensor = preprocess_for_clip(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_preprocess_coerces_rgba_to_three_channels() {
        let img = DynamicImage::new_rgba8(64, 64);
        let tensor = preprocess_for_clip(&img);
        assert_eq!(tensor.dim().1, 3);
    }

    #[test]
    fn test_preprocess_coerces_grayscale_to_three_channels() {
        let img = DynamicImage::new_luma8(64, 64);
        let tensor = preprocess_for_clip(&img);
        assert_eq!(tensor.dim().1, 3);
    }

    #[test]
    fn test_normalization_of_white_pixels() {
        let mut img = RgbImage::new(10, 10);
        for pixel in img.pixels_mut() {
            *pixel = Rgb([255, 255, 255]);
        }
        let tensor = preprocess_for_clip(&DynamicImage::ImageRgb8(img));

        // White red channel: (1.0 - 0.48145466) / 0.26862954 ≈ 1.93
        let expected_r = (1.0 - MEAN[0]) / STD[0];
        assert!((tensor[[0, 0, 0, 0]] - expected_r).abs() < 1e-4);

        for val in tensor.iter() {
            assert!(
                *val >= -5.0 && *val <= 5.0,
                "Normalized value {} out of expected range",
                val
            );
        }
    }

    #[test]
    fn test_center_crop_resize_wide_image() {
        let img = DynamicImage::new_rgb8(1000, 500);
        let resized = center_crop_resize(&img, 224);
        assert_eq!(resized.dimensions(), (224, 224));
    }

    #[test]
    fn test_center_crop_resize_tall_image() {
        let img = DynamicImage::new_rgb8(500, 1000);
        let resized = center_crop_resize(&img, 224);
        assert_eq!(resized.dimensions(), (224, 224));
    }

    #[test]
    fn test_tiny_image_upscales() {
        let img = DynamicImage::new_rgb8(1, 1);
        let tensor = preprocess_for_clip(&img);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }
}
