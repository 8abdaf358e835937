//! Motion direction labels.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Direction the generated motion should progress in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum Direction {
    Left,
    #[default]
    Right,
    Up,
    Down,
    #[serde(rename = "Zoom In")]
    ZoomIn,
    #[serde(rename = "Zoom Out")]
    ZoomOut,
}

impl Direction {
    /// All supported directions, in presentation order.
    pub const ALL: &'static [Direction] = &[
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
        Direction::ZoomIn,
        Direction::ZoomOut,
    ];

    /// Label sent to the model and shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Right => "Right",
            Direction::Up => "Up",
            Direction::Down => "Down",
            Direction::ZoomIn => "Zoom In",
            Direction::ZoomOut => "Zoom Out",
        }
    }

    /// Whether the motion is a camera zoom rather than a pan.
    pub fn is_zoom(&self) -> bool {
        matches!(self, Direction::ZoomIn | Direction::ZoomOut)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Direction {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();

        match normalized.as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "zoomin" => Ok(Direction::ZoomIn),
            "zoomout" => Ok(Direction::ZoomOut),
            _ => Err(DirectionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown direction: {0}")]
pub struct DirectionParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("left".parse::<Direction>().unwrap(), Direction::Left);
        assert_eq!("Zoom In".parse::<Direction>().unwrap(), Direction::ZoomIn);
        assert_eq!("zoom_out".parse::<Direction>().unwrap(), Direction::ZoomOut);
        assert_eq!("ZOOM-IN".parse::<Direction>().unwrap(), Direction::ZoomIn);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_labels_roundtrip() {
        for direction in Direction::ALL {
            assert_eq!(direction.label().parse::<Direction>().unwrap(), *direction);
        }
    }

    #[test]
    fn test_direction_serde_uses_labels() {
        let json = serde_json::to_string(&Direction::ZoomOut).unwrap();
        assert_eq!(json, "\"Zoom Out\"");
        let parsed: Direction = serde_json::from_str("\"Up\"").unwrap();
        assert_eq!(parsed, Direction::Up);
    }
}
