//! # Vertex — Per-Corner Data Handed to the Backend
//!
//! A batch keeps three parallel arrays, one entry per quad corner for
//! positions and UVs and six `u16` entries per quad for indices. Keeping them
//! separate (instead of one interleaved struct) matches what the backend
//! contract receives and lets a backend upload each array as its own buffer.
//!
//! ```text
//! Vertex   (12 bytes)        TexCoord (8 bytes)
//! ┌────────────────┐         ┌──────────────┐
//! │ position       │         │ uv           │
//! │ [f32; 3]       │         │ [f32; 2]     │
//! │ z always 0     │         │ normalized   │
//! └────────────────┘         └──────────────┘
//! ```
//!
//! `#[repr(C)]` plus the `bytemuck` traits let a backend cast `&[Vertex]` to
//! `&[u8]` for upload without copying.

use bytemuck::{Pod, Zeroable};

use crate::math::Vec2;

/// Corner position. The batcher is strictly 2D; `z` is always 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y, 0.0] }
    }
}

impl From<Vec2> for Vertex {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Normalized texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TexCoord {
    pub uv: [f32; 2],
}

impl TexCoord {
    pub fn new(u: f32, v: f32) -> Self {
        Self { uv: [u, v] }
    }
}

impl From<Vec2> for TexCoord {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}
