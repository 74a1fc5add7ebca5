//! Axis-aligned bounding boxes
//!
//! [`Bounds`] is the stored, local form: an offset from the owning transform
//! plus an integer size. [`Rect`] is the world-space form used by the overlap
//! test.

use serde::{Deserialize, Serialize};

use crate::math::{Vec2, Vec3};

/// Local AABB relative to the owning transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Bottom-left corner offset from the transform position
    pub coords: Vec2,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: u32, height: u32) -> Self {
        Self { coords: Vec2::new(x, y), width, height }
    }

    /// Place the box in the world at `origin` moved by `displacement`.
    pub fn world_rect(&self, origin: Vec3, displacement: Vec3) -> Rect {
        Rect {
            x: origin.x + displacement.x + self.coords.x,
            y: origin.y + displacement.y + self.coords.y,
            width: self.width as f32,
            height: self.height as f32,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// World-space AABB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Separating-axis test on both axes.
    ///
    /// Intervals are half-open, so boxes that only share an edge do not
    /// overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }
}
