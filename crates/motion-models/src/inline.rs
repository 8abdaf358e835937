//! Inline image payloads.
//!
//! Images travel through the studio as base64 text, the same shape the
//! Gemini API accepts and returns. A payload may arrive either as raw
//! base64 or wrapped in a `data:<mime>;base64,` URL; the prefix is always
//! stripped on parse so the stored payload is the bare encoding.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MIME type every generated or upscaled frame is normalized to.
pub const PNG_MIME: &str = "image/png";

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A base64-encoded image with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// MIME type, e.g. `image/png`
    pub mime_type: String,
    /// Base64 payload without any data-URL prefix
    pub data: String,
}

#[derive(Debug, Error)]
pub enum InlineImageError {
    #[error("Malformed data URL: {0}")]
    MalformedDataUrl(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Empty image payload")]
    Empty,
}

impl InlineImage {
    /// Wrap raw image bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Wrap a base64 payload that is already known to be bare.
    pub fn from_base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build a PNG-labelled image from a model response payload.
    ///
    /// The label is applied regardless of the payload's real encoding.
    pub fn png(data: impl Into<String>) -> Self {
        Self::from_base64(PNG_MIME, data)
    }

    /// Parse either a `data:` URL or a bare base64 string.
    ///
    /// Bare payloads are labelled `fallback_mime`.
    pub fn parse(input: &str, fallback_mime: &str) -> Result<Self, InlineImageError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InlineImageError::Empty);
        }

        match input.strip_prefix(DATA_PREFIX) {
            Some(rest) => {
                let (mime, data) = rest
                    .split_once(BASE64_MARKER)
                    .ok_or_else(|| InlineImageError::MalformedDataUrl(truncate(input)))?;
                if data.is_empty() {
                    return Err(InlineImageError::Empty);
                }
                let mime = if mime.is_empty() { fallback_mime } else { mime };
                Ok(Self::from_base64(mime, data))
            }
            None => Ok(Self::from_base64(fallback_mime, input)),
        }
    }

    /// Render as a `data:<mime>;base64,<payload>` URL.
    pub fn to_data_url(&self) -> String {
        format!("{}{}{}{}", DATA_PREFIX, self.mime_type, BASE64_MARKER, self.data)
    }

    /// Decode the payload to raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, InlineImageError> {
        if self.data.is_empty() {
            return Err(InlineImageError::Empty);
        }
        Ok(STANDARD.decode(self.data.as_bytes())?)
    }

    /// Approximate decoded size in bytes, without decoding.
    pub fn approx_decoded_len(&self) -> usize {
        self.data.len() / 4 * 3
    }
}

impl fmt::Display for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} base64 chars)", self.mime_type, self.data.len())
    }
}

/// Strip a `data:<mime>;base64,` prefix if present.
pub fn strip_data_prefix(input: &str) -> &str {
    match input.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.split_once(BASE64_MARKER).map(|(_, d)| d).unwrap_or(input),
        None => input,
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(48).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_url_strips_prefix() {
        let image = InlineImage::parse("data:image/jpeg;base64,AAEC", PNG_MIME).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "AAEC");
        assert_eq!(image.decode().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_bare_payload_uses_fallback_mime() {
        let image = InlineImage::parse("AAEC", PNG_MIME).unwrap();
        assert_eq!(image.mime_type, PNG_MIME);
        assert_eq!(image.to_data_url(), "data:image/png;base64,AAEC");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(InlineImage::parse("data:image/png,AAEC", PNG_MIME).is_err());
        assert!(InlineImage::parse("data:image/png;base64,", PNG_MIME).is_err());
        assert!(InlineImage::parse("   ", PNG_MIME).is_err());
    }

    #[test]
    fn test_strip_data_prefix() {
        assert_eq!(strip_data_prefix("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_prefix("QUJD"), "QUJD");
    }

    #[test]
    fn test_png_normalization() {
        let image = InlineImage::png("QUJD");
        assert_eq!(image.mime_type, PNG_MIME);
        assert_eq!(image.decode().unwrap(), b"ABC");
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let image = InlineImage::from_bytes("image/webp", b"ABC");
        assert_eq!(image.data, "QUJD");
        assert_eq!(image.decode().unwrap(), b"ABC");
        assert_eq!(image.approx_decoded_len(), 3);
    }
}
