//! Geometry helpers for face boxes, the guide region and pointer positions.

use serde::{Deserialize, Serialize};

/// A point in pixel or normalized coordinates, depending on context
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate (grows downwards)
    pub y: f32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Area of the box (zero for degenerate boxes)
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Center point of the box
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when `point` lies strictly inside the box; points on the border are outside
    #[must_use]
    pub fn contains_strict(&self, point: Point) -> bool {
        self.x < point.x
            && point.x < self.x + self.width
            && self.y < point.y
            && point.y < self.y + self.height
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f32; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x, bbox.y, bbox.width, bbox.height]
    }
}

/// Square guide region centered in a frame.
///
/// The side is `ratio * frame_height`, truncated to whole pixels, so that the
/// region lines up with what the face-guide screen draws.
#[must_use]
pub fn guide_box(frame_width: u32, frame_height: u32, ratio: f32) -> BoundingBox {
    let side = (frame_height as f32 * ratio).floor().max(0.0);
    let x = ((frame_width as f32 - side) / 2.0).floor();
    let y = ((frame_height as f32 - side) / 2.0).floor();
    BoundingBox::new(x, y, side, side)
}

/// The largest face by area, i.e. the person closest to the kiosk
#[must_use]
pub fn largest_face(faces: &[BoundingBox]) -> Option<BoundingBox> {
    faces
        .iter()
        .copied()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Convert a pixel position into normalized `[0, 1]` frame coordinates
#[must_use]
pub fn normalize(point: Point, frame_width: u32, frame_height: u32) -> Option<Point> {
    if frame_width == 0 || frame_height == 0 {
        return None;
    }
    Some(Point::new(
        point.x / frame_width as f32,
        point.y / frame_height as f32,
    ))
}
