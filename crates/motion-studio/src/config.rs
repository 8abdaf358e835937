//! Studio configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::playback::{DEFAULT_FPS, MAX_FPS, MIN_FPS};

/// Studio configuration.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Number of frames generated after the seed
    pub frame_count: usize,
    /// Delay between consecutive generation requests
    pub generation_stagger: Duration,
    /// Delay between consecutive upscale requests
    pub upscale_stagger: Duration,
    /// Initial playback rate (frames per second)
    pub playback_fps: u32,
    /// Work directory for temporary export files
    pub work_dir: PathBuf,
    /// Time FFmpeg may take to finish an export after the last frame
    pub export_timeout: Duration,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            frame_count: 10,
            generation_stagger: Duration::from_millis(300),
            upscale_stagger: Duration::from_millis(500),
            playback_fps: DEFAULT_FPS,
            work_dir: std::env::temp_dir().join("motion-gen"),
            export_timeout: Duration::from_secs(120),
        }
    }
}

impl StudioConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            frame_count: std::env::var("MOTION_FRAME_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.frame_count),
            generation_stagger: Duration::from_millis(
                std::env::var("MOTION_GENERATION_STAGGER_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            upscale_stagger: Duration::from_millis(
                std::env::var("MOTION_UPSCALE_STAGGER_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            playback_fps: std::env::var("MOTION_PLAYBACK_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|fps: u32| fps.clamp(MIN_FPS, MAX_FPS))
                .unwrap_or(DEFAULT_FPS),
            work_dir: std::env::var("MOTION_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            export_timeout: Duration::from_secs(
                std::env::var("MOTION_EXPORT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
        }
    }
}
