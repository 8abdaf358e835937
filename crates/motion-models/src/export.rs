//! Export artifact naming.

use chrono::{DateTime, Utc};

/// Prefix shared by every exported artifact.
pub const ARTIFACT_PREFIX: &str = "motion-gen";

/// Display duration of each frame in an exported video (milliseconds).
pub const FRAME_DISPLAY_MS: u64 = 250;

/// Capture rate of the exported video (frames per second).
pub const CAPTURE_FPS: u32 = 30;

/// Timestamp component used in artifact names (Unix epoch milliseconds).
pub fn artifact_timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// `motion-gen-<timestamp>.<ext>`
pub fn video_file_name(at: DateTime<Utc>, extension: &str) -> String {
    format!("{}-{}.{}", ARTIFACT_PREFIX, artifact_timestamp(at), extension)
}

/// `motion-gen-frames-<timestamp>.zip`
pub fn archive_file_name(at: DateTime<Utc>) -> String {
    format!("{}-frames-{}.zip", ARTIFACT_PREFIX, artifact_timestamp(at))
}

/// `frame_NNN.png` for a 0-based sequence position (names are 1-based).
pub fn frame_entry_name(position: usize) -> String {
    format!("frame_{:03}.png", position + 1)
}
