//! Media handling for the motion-gen studio.
//!
//! This crate provides:
//! - Seed image intake (content-type and format validation)
//! - Type-safe FFmpeg command building for piped raw video
//! - Progress parsing from `-progress pipe:2`
//! - Video assembly with container fallback
//! - Zip packaging of frame sequences

pub mod archive;
pub mod command;
pub mod error;
pub mod intake;
pub mod progress;
pub mod video;

pub use archive::{build_archive, ArchiveArtifact, ARCHIVE_MIME};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, FfmpegSession};
pub use error::{MediaError, MediaResult};
pub use intake::{image_dimensions, inline_dimensions, intake_image, IntakeImage};
pub use progress::FfmpegProgress;
pub use video::{capture_slots, choose_container, VideoArtifact, VideoContainer, VideoExporter};
