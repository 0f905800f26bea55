use serde::{Deserialize, Serialize};

/// Axis-aligned box in page pixel space, origin top-left.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Builds a box from the OCR `left/top/width/height` convention.
    pub fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width.max(0.0), top + height.max(0.0))
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Vertical distance from the bottom edge of `self` down to the top edge of `below`.
    /// Negative when the boxes overlap vertically.
    pub fn vertical_gap_to(&self, below: &Self) -> f32 {
        below.y0 - self.y1
    }
}

/// Top-left corner of a box relative to the page, each coordinate clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RelPos {
    pub x_rel: f32,
    pub y_rel: f32,
}

impl RelPos {
    pub fn of(bbox: &BBox, page_width: f32, page_height: f32) -> Self {
        Self {
            x_rel: (bbox.x0 / page_width).clamp(0.0, 1.0),
            y_rel: (bbox.y0 / page_height).clamp(0.0, 1.0),
        }
    }
}
