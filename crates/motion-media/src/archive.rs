//! Frame archive packaging.

use chrono::Utc;
use motion_models::export::{archive_file_name, frame_entry_name};
use motion_models::InlineImage;
use std::io::{Cursor, Write};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{MediaError, MediaResult};

/// MIME type of the archive artifact.
pub const ARCHIVE_MIME: &str = "application/zip";

/// A finished archive export.
#[derive(Debug, Clone)]
pub struct ArchiveArtifact {
    /// `motion-gen-frames-<timestamp>.zip`
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Entry names in archive order
    pub entries: Vec<String>,
}

/// Package every image, in order, as `frame_NNN.png`.
///
/// Entries hold the decoded payload bytes unchanged.
pub fn build_archive(images: &[InlineImage]) -> MediaResult<ArchiveArtifact> {
    if images.is_empty() {
        return Err(MediaError::EmptySequence);
    }

    // Decode before writing so a bad payload leaves no partial archive
    let payloads = images
        .iter()
        .map(InlineImage::decode)
        .collect::<Result<Vec<_>, _>>()?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = Vec::with_capacity(payloads.len());

    for (position, payload) in payloads.iter().enumerate() {
        let name = frame_entry_name(position);
        writer.start_file(name.as_str(), options)?;
        writer.write_all(payload)?;
        entries.push(name);
    }

    let bytes = writer.finish()?.into_inner();

    metrics::counter!("motion_exports_total", "kind" => "archive").increment(1);
    info!(entries = entries.len(), size_bytes = bytes.len(), "Frame archive built");

    Ok(ArchiveArtifact {
        file_name: archive_file_name(Utc::now()),
        bytes,
        entries,
    })
}
