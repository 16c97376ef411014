//! # Render2d — Batched Textured Quads
//!
//! Everything here runs on the CPU. Draw calls turn into quads, quads are
//! grouped by image and tint, and each group becomes one backend submission
//! at flush.
//!
//! ## Architecture
//!
//! ```text
//!  SpriteBatcher                     (registry.rs)
//!   └─ ImageEntry      per image, in registration order
//!       └─ TintGroups  per image     (tint.rs)
//!           └─ TintGroup per tint, default first
//!               └─ GeometryBatch ≤ 16384 quads   (batch.rs)
//!                   ├─ vertices  [Vertex]        (vertex.rs)
//!                   ├─ indices   [u16]
//!                   └─ uvs       [TexCoord]
//! ```
//!
//! Font images are ordinary images whose pixels come from a [`GlyphAtlas`]
//! (font.rs) instead of a file (texture.rs). Text drawing is one pivoted quad
//! per glyph against that atlas.
//!
//! ## Design Decisions
//!
//! **Transforms on the CPU.** Rotation, scaling and translation are baked into
//! vertex positions before submission. Every quad for one image and tint can
//! then share a draw call regardless of how each was transformed.
//!
//! **16-bit indices.** Batches use `u16` indices, which caps a batch at 16384
//! quads. Hitting the cap either starts a new batch or refuses the quad,
//! depending on [`OverflowPolicy`](crate::config::OverflowPolicy).
//!
//! **Registration order is layer order.** Images are flushed in the order they
//! were registered, not the order they were drawn.

mod batch;
mod font;
mod registry;
mod texture;
mod tint;
mod vertex;

pub use batch::{GeometryBatch, HALF_TEXEL, Inset, MAX_QUADS_PER_BATCH, Source};
#[cfg(feature = "text")]
pub use font::FontdueTypeface;
pub use font::{
    CharRange, FontConfig, GlyphAtlas, GlyphMetrics, GlyphQuad, Typeface, TypefaceSource, canvas_size_for,
};
pub use registry::{FlushStats, FontParameters, ImageEntry, SpriteBatcher};
pub use texture::{ArchiveRef, FileAssets, ImageId, ImageSource, PixelSource, Realized, realize};
pub use tint::{Tint, TintGroup, TintGroups};
pub use vertex::{TexCoord, Vertex};
