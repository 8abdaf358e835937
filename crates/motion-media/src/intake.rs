//! Seed image intake.
//!
//! Validates an uploaded image and converts it to the inline representation
//! sent to the model.

use image::io::Reader as ImageReader;
use image::ImageFormat;
use motion_models::InlineImage;
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Uploads above this size are accepted but logged.
pub const ADVISORY_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// An image accepted by intake.
#[derive(Debug, Clone)]
pub struct IntakeImage {
    /// Inline payload carrying the declared MIME type
    pub image: InlineImage,
    /// Format detected from the bytes
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Size of the raw upload in bytes
    pub size_bytes: usize,
}

/// Validate and convert an uploaded image.
///
/// The declared content type must be `image/*` and the body must decode as
/// a known raster format. Parameters on the content type are ignored.
pub fn intake_image(content_type: Option<&str>, bytes: &[u8]) -> MediaResult<IntakeImage> {
    let mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase())
        .unwrap_or_default();

    if !mime.starts_with("image/") || mime.len() == "image/".len() {
        return Err(MediaError::NotAnImage(if mime.is_empty() {
            "missing content type".to_string()
        } else {
            mime
        }));
    }

    if bytes.is_empty() {
        return Err(MediaError::EmptyUpload);
    }

    if bytes.len() > ADVISORY_UPLOAD_BYTES {
        warn!(
            size_bytes = bytes.len(),
            advisory_bytes = ADVISORY_UPLOAD_BYTES,
            "Seed image is larger than the advisory size"
        );
    }

    let format = image::guess_format(bytes)
        .map_err(|_| MediaError::invalid_image("unrecognized image data"))?;
    let (width, height) = image_dimensions(bytes)?;

    debug!(
        mime = %mime,
        format = ?format,
        width,
        height,
        size_bytes = bytes.len(),
        "Accepted seed image"
    );

    Ok(IntakeImage {
        image: InlineImage::from_bytes(mime, bytes),
        format,
        width,
        height,
        size_bytes: bytes.len(),
    })
}

/// Read pixel dimensions from encoded image bytes without a full decode.
pub fn image_dimensions(bytes: &[u8]) -> MediaResult<(u32, u32)> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;

    if width == 0 || height == 0 {
        return Err(MediaError::invalid_image("image has a zero dimension"));
    }

    Ok((width, height))
}

/// Dimensions of an inline image.
pub fn inline_dimensions(image: &InlineImage) -> MediaResult<(u32, u32)> {
    image_dimensions(&image.decode()?)
}
