use crate::types::Keypoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, half-open on the right and bottom edges
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// `x <= px < x + width` and `y <= py < y + height`
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Keeps only keypoints inside a fixed region of interest
#[derive(Debug, Clone, Copy, Default)]
pub struct RoiFilter {
    rect: Option<Rect>,
}

impl RoiFilter {
    pub fn new(rect: Rect) -> Self {
        Self { rect: Some(rect) }
    }

    /// A filter that passes everything through
    pub fn disabled() -> Self {
        Self { rect: None }
    }

    pub fn rect(&self) -> Option<&Rect> {
        self.rect.as_ref()
    }

    /// Build the retained subsequence, preserving detector order
    pub fn apply(&self, keypoints: &[Keypoint]) -> Vec<Keypoint> {
        match &self.rect {
            Some(rect) => keypoints
                .iter()
                .filter(|kp| rect.contains(kp.x, kp.y))
                .copied()
                .collect(),
            None => keypoints.to_vec(),
        }
    }
}

impl From<Option<Rect>> for RoiFilter {
    fn from(rect: Option<Rect>) -> Self {
        Self { rect }
    }
}
