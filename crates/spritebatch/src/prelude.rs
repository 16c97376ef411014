//! Convenience re-exports — `use spritebatch::prelude::*` for the common items.

pub use crate::config::{BatcherConfig, OverflowPolicy};
pub use crate::error::{BatchError, Result};
pub use crate::math::{PixelRect, UVec2, Vec2};
#[cfg(feature = "gpu")]
pub use crate::render::WgpuBackend;
pub use crate::render::{Drawer, FrameDriver, RecordingBackend, RenderBackend, TextureHandle};
#[cfg(feature = "text")]
pub use crate::render2d::FontdueTypeface;
pub use crate::render2d::{
    CharRange, FileAssets, FlushStats, FontConfig, FontParameters, ImageId, ImageSource, Inset, Source,
    SpriteBatcher, Tint,
};
pub use crate::time::FrameClock;
