//! Per-frame gesture observations and confirmed gestures.

use crate::utils::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw label produced by a gesture classifier for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureLabel {
    /// Pointing at the left third of the screen
    Left,
    /// Pointing at the middle of the screen
    Center,
    /// Pointing at the right third of the screen
    Right,
    /// A hand is visible but not pointing anywhere useful
    Free,
    /// Nothing usable was detected
    None,
}

impl GestureLabel {
    /// Directional labels map onto a selectable direction; `Free` and `None` do not
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Left => Some(Direction::Left),
            Self::Center => Some(Direction::Center),
            Self::Right => Some(Direction::Right),
            Self::Free | Self::None => None,
        }
    }

    /// Lowercase name, as used in configuration and scripts
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Free => "free",
            Self::None => "none",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three on-screen selection zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left button zone
    Left,
    /// Center button zone
    Center,
    /// Right button zone
    Right,
}

impl From<Direction> for GestureLabel {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::Left,
            Direction::Center => Self::Center,
            Direction::Right => Self::Right,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        GestureLabel::from(*self).fmt(f)
    }
}

/// A single classifier output for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Predicted label
    pub label: GestureLabel,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    /// Index of the frame this observation belongs to
    pub frame_index: u64,
    /// Normalized pointing position, when derived from keypoints
    pub pointer: Option<Point>,
}

impl Observation {
    /// Create an observation without a pointer position
    #[must_use]
    pub fn new(label: GestureLabel, confidence: f32, frame_index: u64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
            frame_index,
            pointer: None,
        }
    }

    /// Neutral observation used for empty, malformed or failed frames
    #[must_use]
    pub fn idle(frame_index: u64) -> Self {
        Self::new(GestureLabel::Free, 0.0, frame_index)
    }

    /// Attach the normalized pointing position
    #[must_use]
    pub fn with_pointer(mut self, pointer: Point) -> Self {
        self.pointer = Some(pointer);
        self
    }
}

/// A direction accepted by the stability policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedGesture {
    /// Confirmed direction
    pub direction: Direction,
    /// Frame on which the confirmation fired
    pub frame_index: u64,
}
