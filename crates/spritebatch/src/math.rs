//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. [`PixelRect`] is the rectangle type used for both
//! destination geometry and texture source regions.

use serde::{Deserialize, Serialize};

pub use glam::{UVec2, Vec2};

/// An axis-aligned rectangle in pixel space.
///
/// Coordinates follow the canvas convention: the origin is the top-left
/// corner and y grows downward, so `top <= bottom` for a well-formed rect.
/// Nothing here enforces that; inverted or zero-area rects simply produce
/// inverted or degenerate quads.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelRect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Build from an origin and a size.
    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(x, y, x + w, y + h)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.left + self.right) * 0.5, (self.top + self.bottom) * 0.5)
    }

    /// Corners in quad order: top-left, bottom-left, bottom-right, top-right.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.left, self.top),
            Vec2::new(self.left, self.bottom),
            Vec2::new(self.right, self.bottom),
            Vec2::new(self.right, self.top),
        ]
    }

    /// Shrink every edge by `amount` pixels.
    pub fn inset(&self, amount: f32) -> Self {
        Self::new(
            self.left + amount,
            self.top + amount,
            self.right - amount,
            self.bottom - amount,
        )
    }
}

/// Rotate `point` by `degrees` about the origin.
///
/// `x' = cos·x − sin·y`, `y' = sin·x + cos·y`.
pub fn rotate_degrees(point: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(point)
}
