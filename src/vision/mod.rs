// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image input handling for the /embed/image endpoint

pub mod image_utils;

pub use image_utils::{decode_base64_image, format_from_mime, sniff_format, ImageInputError};
