//! Shared data models for the motion-gen studio.
//!
//! This crate provides Serde-serializable types for:
//! - Inline (base64) image payloads
//! - Frames and ordered sequences
//! - Generation status tracking
//! - Motion directions, aspect ratios and resolution tiers
//! - Export artifact naming

pub mod aspect;
pub mod direction;
pub mod export;
pub mod frame;
pub mod inline;
pub mod status;

// Re-export common types
pub use aspect::{AspectRatio, AspectRatioParseError, ResolutionTier, ResolutionTierParseError};
pub use direction::{Direction, DirectionParseError};
pub use export::{archive_file_name, frame_entry_name, video_file_name};
pub use frame::{Frame, Sequence, SequenceError, SequenceId};
pub use inline::{strip_data_prefix, InlineImage, InlineImageError, PNG_MIME};
pub use status::{GenerationStatus, OperationKind};
