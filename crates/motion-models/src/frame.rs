//! Frames and ordered sequences.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::InlineImage;

/// Unique identity of a sequence.
///
/// Every assembled or replaced sequence gets a fresh id, so consumers
/// (playback timers, API clients) can tell a new sequence from an old one
/// even when the lengths match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SequenceId(pub Uuid);

impl SequenceId {
    /// Generate a new random sequence ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An image at a position within a sequence (0 = seed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Frame {
    pub index: usize,
    pub image: InlineImage,
}

impl Frame {
    pub fn new(index: usize, image: InlineImage) -> Self {
        Self { index, image }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Expected {expected} frames, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Frame index {index} is missing or duplicated")]
    NonContiguous { index: usize },
}

/// An ordered list of frames with contiguous indices starting at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Sequence {
    id: SequenceId,
    frames: Vec<Frame>,
    created_at: DateTime<Utc>,
}

impl Sequence {
    /// Assemble a sequence from a seed and index-tagged generated images.
    ///
    /// `generated` may arrive in any order; tags are 1-based and must cover
    /// `1..=generated.len()` exactly once.
    pub fn assemble(
        seed: InlineImage,
        mut generated: Vec<(usize, InlineImage)>,
    ) -> Result<Self, SequenceError> {
        generated.sort_by_key(|(index, _)| *index);

        let mut frames = Vec::with_capacity(generated.len() + 1);
        frames.push(Frame::new(0, seed));
        for (position, (index, image)) in generated.into_iter().enumerate() {
            if index != position + 1 {
                return Err(SequenceError::NonContiguous { index: position + 1 });
            }
            frames.push(Frame::new(index, image));
        }

        Ok(Self::from_ordered(frames))
    }

    /// Build a sequence holding only the given frames, reindexed from 0.
    pub fn from_images(images: Vec<InlineImage>) -> Self {
        let frames = images
            .into_iter()
            .enumerate()
            .map(|(index, image)| Frame::new(index, image))
            .collect();
        Self::from_ordered(frames)
    }

    /// Produce a new sequence of identical length where every frame is
    /// replaced by the image tagged with its index.
    ///
    /// `replacements` may arrive in any order; tags are 0-based.
    pub fn replace_frames(
        &self,
        mut replacements: Vec<(usize, InlineImage)>,
    ) -> Result<Self, SequenceError> {
        if replacements.len() != self.frames.len() {
            return Err(SequenceError::LengthMismatch {
                expected: self.frames.len(),
                actual: replacements.len(),
            });
        }

        replacements.sort_by_key(|(index, _)| *index);

        let mut frames = Vec::with_capacity(replacements.len());
        for (position, (index, image)) in replacements.into_iter().enumerate() {
            if index != position {
                return Err(SequenceError::NonContiguous { index: position });
            }
            frames.push(Frame::new(index, image));
        }

        Ok(Self::from_ordered(frames))
    }

    fn from_ordered(frames: Vec<Frame>) -> Self {
        Self {
            id: SequenceId::new(),
            frames,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The seed frame (index 0).
    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Iterate over the images in order.
    pub fn images(&self) -> impl Iterator<Item = &InlineImage> {
        self.frames.iter().map(|f| &f.image)
    }
}
