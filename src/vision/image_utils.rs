// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Base64 image decoding for embedding requests
//!
//! The request's declared MIME type is advisory only: the actual format is
//! always sniffed from the decoded bytes, so a mislabeled payload still
//! decodes if the bytes themselves are a supported image.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Maximum decoded image size (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Client-side image input failures. All of these map to a 400 response;
/// none are fatal to the process.
#[derive(Debug, Error)]
pub enum ImageInputError {
    #[error("Image data is empty")]
    EmptyData,

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unrecognized image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),
}

/// Decodes a base64-encoded image into a pixel buffer
///
/// # Arguments
/// * `base64_str` - Base64 encoded image data (standard alphabet)
///
/// # Returns
/// * `Ok((DynamicImage, ImageFormat))` - Decoded image and the sniffed format
/// * `Err(ImageInputError)` - If the string is not valid base64, the bytes
///   are not a supported image, or the payload exceeds the size cap
pub fn decode_base64_image(
    base64_str: &str,
) -> Result<(DynamicImage, ImageFormat), ImageInputError> {
    if base64_str.is_empty() {
        return Err(ImageInputError::EmptyData);
    }

    let bytes = STANDARD.decode(base64_str)?;

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageInputError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    if bytes.is_empty() {
        return Err(ImageInputError::EmptyData);
    }

    let format = sniff_format(&bytes)?;

    let image = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageInputError::DecodeFailed(e.to_string()))?;

    Ok((image, format))
}

/// Detects the image format from magic bytes
pub fn sniff_format(bytes: &[u8]) -> Result<ImageFormat, ImageInputError> {
    if bytes.len() < 4 {
        return Err(ImageInputError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageInputError::UnsupportedFormat),
    }
}

/// Maps a declared MIME type to the format it claims.
///
/// Used only to log a warning when the declaration disagrees with the
/// sniffed bytes; the sniffed format always wins.
pub fn format_from_mime(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        "image/bmp" => Some(ImageFormat::Bmp),
        "image/tiff" => Some(ImageFormat::Tiff),
        _ => None,
    }
}
