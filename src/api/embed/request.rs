// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request types for the embedding endpoints

use serde::{Deserialize, Serialize};

/// Request body for POST /embed/text
///
/// Any string is acceptable, including the empty string — it is tokenized
/// and padded like any other input. There is no invalid form of text.
///
/// # Example
/// ```json
/// {"text": "a photo of a dog"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEmbedRequest {
    /// Text to embed
    pub text: String,
}

/// Request body for POST /embed/image
///
/// # Example
/// ```json
/// {"image": "iVBORw0KGgo...", "mime_type": "image/png"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEmbedRequest {
    /// Base64 encoded image data
    pub image: String,

    /// Declared MIME type. Advisory only: the format is sniffed from the
    /// decoded bytes and a mismatching declaration is logged, not rejected.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

fn default_mime_type() -> String {
    "image/jpeg".to_string()
}
