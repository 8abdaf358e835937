//! Aspect ratio and resolution tier definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aspect ratio accepted by the upscale model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Square (1:1)
    pub const SQUARE: AspectRatio = AspectRatio::new(1, 1);

    /// Classic portrait (3:4)
    pub const PORTRAIT_3_4: AspectRatio = AspectRatio::new(3, 4);

    /// Classic landscape (4:3)
    pub const LANDSCAPE_4_3: AspectRatio = AspectRatio::new(4, 3);

    /// Tall portrait (9:16)
    pub const PORTRAIT_9_16: AspectRatio = AspectRatio::new(9, 16);

    /// Widescreen (16:9)
    pub const LANDSCAPE_16_9: AspectRatio = AspectRatio::new(16, 9);

    /// Supported ratios in candidate order. Order decides ties when snapping.
    pub const SUPPORTED: &'static [AspectRatio] = &[
        AspectRatio::SQUARE,
        AspectRatio::PORTRAIT_3_4,
        AspectRatio::LANDSCAPE_4_3,
        AspectRatio::PORTRAIT_9_16,
        AspectRatio::LANDSCAPE_16_9,
    ];

    /// Create a new aspect ratio.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Snap pixel dimensions to the nearest supported ratio.
    ///
    /// Nearest means minimum absolute difference between `width / height`
    /// and the candidate's decimal value. On a tie the candidate listed
    /// first in [`AspectRatio::SUPPORTED`] wins. Degenerate dimensions snap
    /// to square.
    pub fn snap(width: u32, height: u32) -> AspectRatio {
        if width == 0 || height == 0 {
            return AspectRatio::SQUARE;
        }
        Self::snap_ratio(width as f64 / height as f64)
    }

    /// Snap a decimal ratio to the nearest supported ratio.
    pub fn snap_ratio(ratio: f64) -> AspectRatio {
        let mut best = AspectRatio::SUPPORTED[0];
        let mut best_diff = (ratio - best.as_f64()).abs();

        for candidate in &AspectRatio::SUPPORTED[1..] {
            let diff = (ratio - candidate.as_f64()).abs();
            // Strict comparison keeps the earlier candidate on ties
            if diff < best_diff {
                best = *candidate;
                best_diff = diff;
            }
        }

        best
    }

    /// Whether this ratio is one of the supported labels.
    pub fn is_supported(&self) -> bool {
        AspectRatio::SUPPORTED.contains(self)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(AspectRatioParseError::InvalidFormat(s.to_string()));
        }

        let width = parts[0]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[0].to_string()))?;
        let height = parts[1]
            .trim()
            .parse()
            .map_err(|_| AspectRatioParseError::InvalidNumber(parts[1].to_string()))?;

        if width == 0 || height == 0 {
            return Err(AspectRatioParseError::ZeroValue);
        }

        Ok(AspectRatio { width, height })
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::SQUARE
    }
}

#[derive(Debug, Error)]
pub enum AspectRatioParseError {
    #[error("Invalid aspect ratio format: {0}, expected 'W:H'")]
    InvalidFormat(String),
    #[error("Invalid number in aspect ratio: {0}")]
    InvalidNumber(String),
    #[error("Aspect ratio cannot have zero values")]
    ZeroValue,
}

/// Output resolution tier requested from the upscale model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum ResolutionTier {
    #[serde(rename = "1K")]
    OneK,
    #[default]
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ResolutionTier {
    /// Label as the model API expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::OneK => "1K",
            ResolutionTier::TwoK => "2K",
            ResolutionTier::FourK => "4K",
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResolutionTier {
    type Err = ResolutionTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1K" => Ok(ResolutionTier::OneK),
            "2K" => Ok(ResolutionTier::TwoK),
            "4K" => Ok(ResolutionTier::FourK),
            _ => Err(ResolutionTierParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown resolution tier: {0}, expected 1K, 2K or 4K")]
pub struct ResolutionTierParseError(String);
