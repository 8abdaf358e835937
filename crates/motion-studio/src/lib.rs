//! Motion sequence studio.
//!
//! This crate provides:
//! - Staggered concurrent frame generation from a seed image
//! - Upscaling of a finished sequence
//! - Playback with a rate-keyed timer
//! - Video and archive export
//! - Single-operation guard and progress status

pub mod batch;
pub mod config;
pub mod error;
pub mod frames;
pub mod guard;
pub mod logging;
pub mod playback;
pub mod studio;
pub mod upscale;

#[cfg(test)]
mod testing;

pub use batch::{run_staggered, BatchFailure};
pub use config::StudioConfig;
pub use error::{StudioError, StudioResult};
pub use frames::FrameOrchestrator;
pub use guard::{OperationGuard, OperationPermit};
pub use logging::OperationLogger;
pub use playback::{Playback, PlaybackDriver, PlaybackError, PlaybackState};
pub use studio::{SeedInfo, Studio};
pub use upscale::UpscaleOrchestrator;
