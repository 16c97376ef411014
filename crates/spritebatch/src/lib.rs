//! # Spritebatch — Batched 2D Sprite and Text Rendering
//!
//! Collects textured quads per image and per tint, then hands each batch to a
//! rendering backend in a stable layering order. Text is drawn through a
//! glyph atlas built from a typeface at startup.
//!
//! Start with `use spritebatch::prelude::*`, register images on a
//! [`SpriteBatcher`](render2d::SpriteBatcher), realize them against a
//! backend, then draw and flush once per frame.

pub mod config;
pub mod error;
pub mod math;
pub mod prelude;
pub mod render;
pub mod render2d;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BatchError, Result};
