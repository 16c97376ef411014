//! # Batch — Quad Geometry for One (Image, Tint) Pair
//!
//! A [`GeometryBatch`] is everything one backend draw submission needs:
//! vertex positions, `u16` triangle indices and normalized UVs. Every `add_*`
//! method appends exactly one quad:
//!
//! ```text
//!   0 ──── 3        vertices: TL, BL, BR, TR
//!   │ ╲    │        indices:  b, b+1, b+2,  b, b+2, b+3
//!   │   ╲  │        where b = 4 × (quads already in the batch)
//!   1 ──── 2
//! ```
//!
//! ## The 16-Bit Ceiling
//!
//! Indices are `u16`, so a batch can address 65536 vertices, which is
//! [`MAX_QUADS_PER_BATCH`] = 16384 quads. The last legal quad uses indices up
//! to 65535. Appending to a full batch returns
//! [`BatchError::IndexOverflow`] and leaves the batch untouched; the owning
//! [`TintGroup`](super::tint::TintGroup) decides whether to split or reject.
//!
//! ## Transform Order
//!
//! Pivoted quads apply scale, then rotation, then translation. Reversing
//! scale and rotation visibly changes the result for non-uniform scale, so
//! the order is fixed.
//!
//! ## Half-Texel Inset
//!
//! When several sprites share one texture, bilinear sampling at the exact
//! edge of a source rect picks up color from the neighboring cell. Shrinking
//! the source rect by half a texel on every side before normalizing avoids
//! that. Whether to inset is a per-call [`Inset`] flag; [`Inset::Auto`]
//! resolves per call site:
//!
//! | call site        | `Auto` resolves to |
//! |------------------|--------------------|
//! | simple / rotated | off                |
//! | line / tile      | off                |
//! | pivoted          | on                 |
//!
//! The registry additionally forces `Auto` to on for glyph atlases.

use super::tint::Tint;
use super::vertex::{TexCoord, Vertex};
use crate::error::{BatchError, Result};
use crate::math::{PixelRect, UVec2, Vec2, rotate_degrees};

/// Quads a single batch can hold before `u16` indices would wrap.
pub const MAX_QUADS_PER_BATCH: usize = (u16::MAX as usize + 1) / 4;

/// Inset applied to each edge of an inset source rect, in pixels.
pub const HALF_TEXEL: f32 = 0.5;

/// Per-call half-texel inset flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inset {
    /// Use the call site's default.
    #[default]
    Auto,
    On,
    Off,
}

impl Inset {
    fn resolve(self, default_on: bool) -> bool {
        match self {
            Inset::Auto => default_on,
            Inset::On => true,
            Inset::Off => false,
        }
    }
}

/// A source region of a texture, in pixels, with its inset flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    pub rect: PixelRect,
    pub inset: Inset,
}

impl Source {
    pub fn new(rect: PixelRect) -> Self {
        Self {
            rect,
            inset: Inset::Auto,
        }
    }

    pub fn with_inset(mut self, inset: bool) -> Self {
        self.inset = if inset { Inset::On } else { Inset::Off };
        self
    }

    /// Turn `Auto` into `On`, leaving explicit choices alone.
    pub(crate) fn prefer_inset(mut self) -> Self {
        if self.inset == Inset::Auto {
            self.inset = Inset::On;
        }
        self
    }

    fn effective_rect(&self, default_on: bool) -> PixelRect {
        if self.inset.resolve(default_on) {
            self.rect.inset(HALF_TEXEL)
        } else {
            self.rect
        }
    }
}

impl From<PixelRect> for Source {
    fn from(rect: PixelRect) -> Self {
        Self::new(rect)
    }
}

/// `a / b`, or 0 when `b` is zero or the result is not finite.
fn ratio(a: f32, b: f32) -> f32 {
    let r = a / b;
    if b == 0.0 || !r.is_finite() { 0.0 } else { r }
}

/// Vertex, index and UV buffers for one backend draw submission.
#[derive(Debug, Clone)]
pub struct GeometryBatch {
    tint: Tint,
    texture_size: UVec2,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    uvs: Vec<TexCoord>,
}

impl GeometryBatch {
    /// Create an empty batch for a texture of `texture_size` pixels.
    pub fn new(tint: Tint, texture_size: UVec2) -> Self {
        Self {
            tint,
            texture_size,
            vertices: Vec::new(),
            indices: Vec::new(),
            uvs: Vec::new(),
        }
    }

    pub fn tint(&self) -> Tint {
        self.tint
    }

    pub fn texture_size(&self) -> UVec2 {
        self.texture_size
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn uvs(&self) -> &[TexCoord] {
        &self.uvs
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.quad_count() >= MAX_QUADS_PER_BATCH
    }

    /// Drop all geometry, keeping buffer capacity for the next frame.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.uvs.clear();
    }

    /// Append a quad from already-transformed corners and normalized UVs.
    pub fn add_quad(&mut self, corners: [Vec2; 4], uvs: [Vec2; 4]) -> Result<()> {
        if self.is_full() {
            return Err(BatchError::IndexOverflow {
                quads: self.quad_count(),
                limit: MAX_QUADS_PER_BATCH,
            });
        }

        // Fits: the largest base is 4 × (MAX_QUADS_PER_BATCH - 1) = 65532.
        let base = self.vertices.len() as u16;
        self.vertices.extend(corners.map(Vertex::from));
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        self.uvs.extend(uvs.map(TexCoord::from));
        Ok(())
    }

    /// Axis-aligned `src` → `dst` copy.
    pub fn add_simple_quad(&mut self, dst: PixelRect, src: Source) -> Result<()> {
        let uvs = self.normalized(src.effective_rect(false));
        self.add_quad(dst.corners(), uvs)
    }

    /// Like [`add_simple_quad`](Self::add_simple_quad), rotated by `degrees`
    /// about the center of `dst`.
    pub fn add_rotated_quad(&mut self, dst: PixelRect, src: Source, degrees: f32) -> Result<()> {
        let center = dst.center();
        let corners = dst
            .corners()
            .map(|c| rotate_degrees(c - center, degrees) + center);
        let uvs = self.normalized(src.effective_rect(false));
        self.add_quad(corners, uvs)
    }

    /// Place `local` (corner offsets relative to the pivot) at `pivot`,
    /// applying scale, then rotation, then translation.
    pub fn add_pivoted_quad(
        &mut self,
        pivot: Vec2,
        local: PixelRect,
        degrees: f32,
        scale: Vec2,
        src: Source,
    ) -> Result<()> {
        let corners = local
            .corners()
            .map(|c| rotate_degrees(c * scale, degrees) + pivot);
        let uvs = self.normalized(src.effective_rect(true));
        self.add_quad(corners, uvs)
    }

    /// A strip `thickness` pixels wide from `p1` to `p2`.
    ///
    /// U runs from 0 to `floor(length / src_width)` so the source repeats
    /// along the line (the backend samples with repeat addressing); V covers
    /// the source rect's vertical span.
    pub fn add_line_quad(&mut self, p1: Vec2, p2: Vec2, thickness: f32, src: Source) -> Result<()> {
        let d = p2 - p1;
        let angle = d.y.atan2(d.x);
        let half = Vec2::new(-angle.sin(), angle.cos()) * (thickness * 0.5);
        let corners = [p1 - half, p1 + half, p2 + half, p2 - half];

        let rect = src.effective_rect(false);
        let repeats = ratio(d.length(), rect.width()).floor();
        let size = self.size_f32();
        let v0 = ratio(rect.top, size.y);
        let v1 = ratio(rect.bottom, size.y);
        let uvs = [
            Vec2::new(0.0, v0),
            Vec2::new(0.0, v1),
            Vec2::new(repeats, v1),
            Vec2::new(repeats, v0),
        ];
        self.add_quad(corners, uvs)
    }

    /// Fill `dst` with the source repeated at `scale`, shifted by `offset`
    /// source pixels. Scrolling `offset` moves the pattern, not the quad.
    pub fn add_tile_quad(&mut self, dst: PixelRect, offset: Vec2, scale: f32, src: Source) -> Result<()> {
        let rect = src.effective_rect(false);
        let (sw, sh) = (rect.width(), rect.height());
        let span = Vec2::new(ratio(dst.width(), sw * scale), ratio(dst.height(), sh * scale));
        let start = Vec2::new(ratio(offset.x, sw), ratio(offset.y, sh));
        let uvs = [
            start,
            Vec2::new(start.x, start.y + span.y),
            start + span,
            Vec2::new(start.x + span.x, start.y),
        ];
        self.add_quad(dst.corners(), uvs)
    }

    fn size_f32(&self) -> Vec2 {
        self.texture_size.as_vec2()
    }

    fn normalized(&self, rect: PixelRect) -> [Vec2; 4] {
        let size = self.size_f32();
        rect.corners()
            .map(|c| Vec2::new(ratio(c.x, size.x), ratio(c.y, size.y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn batch() -> GeometryBatch {
        GeometryBatch::new(Tint::WHITE, UVec2::new(256, 128))
    }

    fn positions(b: &GeometryBatch) -> Vec<[f32; 2]> {
        b.vertices()
            .iter()
            .map(|v| [v.position[0], v.position[1]])
            .collect()
    }

    fn assert_close(actual: [f32; 2], expected: [f32; 2]) {
        assert!(
            (actual[0] - expected[0]).abs() < EPS && (actual[1] - expected[1]).abs() < EPS,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn simple_quad_vertices_follow_dst_corners() {
        let mut b = batch();
        let dst = PixelRect::new(10.0, 20.0, 42.0, 52.0);
        b.add_simple_quad(dst, PixelRect::new(0.0, 0.0, 32.0, 32.0).into())
            .unwrap();
        assert_eq!(
            positions(&b),
            vec![[10.0, 20.0], [10.0, 52.0], [42.0, 52.0], [42.0, 20.0]]
        );
        assert!(b.vertices().iter().all(|v| v.position[2] == 0.0));
    }

    #[test]
    fn simple_quad_uvs_are_src_over_size_without_inset() {
        let mut b = batch();
        let src = PixelRect::new(32.0, 16.0, 64.0, 48.0);
        b.add_simple_quad(PixelRect::new(0.0, 0.0, 1.0, 1.0), src.into())
            .unwrap();
        let uvs: Vec<[f32; 2]> = b.uvs().iter().map(|t| t.uv).collect();
        assert_eq!(
            uvs,
            vec![
                [32.0 / 256.0, 16.0 / 128.0],
                [32.0 / 256.0, 48.0 / 128.0],
                [64.0 / 256.0, 48.0 / 128.0],
                [64.0 / 256.0, 16.0 / 128.0],
            ]
        );
    }

    #[test]
    fn explicit_inset_overrides_call_site_default() {
        let mut b = batch();
        let src = Source::new(PixelRect::new(0.0, 0.0, 16.0, 16.0)).with_inset(true);
        b.add_simple_quad(PixelRect::new(0.0, 0.0, 1.0, 1.0), src).unwrap();
        assert_eq!(b.uvs()[0].uv, [0.5 / 256.0, 0.5 / 128.0]);
        assert_eq!(b.uvs()[2].uv, [15.5 / 256.0, 15.5 / 128.0]);
    }

    #[test]
    fn pivoted_quad_insets_by_default() {
        let mut b = batch();
        b.add_pivoted_quad(
            Vec2::ZERO,
            PixelRect::new(0.0, 0.0, 8.0, 8.0),
            0.0,
            Vec2::ONE,
            PixelRect::new(0.0, 0.0, 16.0, 16.0).into(),
        )
        .unwrap();
        assert_eq!(b.uvs()[0].uv, [0.5 / 256.0, 0.5 / 128.0]);
        assert_eq!(b.uvs()[2].uv, [15.5 / 256.0, 15.5 / 128.0]);
    }

    #[test]
    fn pivoted_quad_at_zero_angle_is_scaled_and_translated() {
        let mut b = batch();
        let local = PixelRect::new(-4.0, -2.0, 4.0, 2.0);
        b.add_pivoted_quad(
            Vec2::new(100.0, 50.0),
            local,
            0.0,
            Vec2::new(2.0, 3.0),
            local.into(),
        )
        .unwrap();
        let expected = [[92.0, 44.0], [92.0, 56.0], [108.0, 56.0], [108.0, 44.0]];
        for (actual, expected) in positions(&b).into_iter().zip(expected) {
            assert_close(actual, expected);
        }
    }

    #[test]
    fn pivoted_quad_scales_before_rotating() {
        // Local corner (1, 0) scaled by (2, 1) then rotated 90° lands at (0, 2).
        // Rotating first would give (0, 1).
        let mut b = batch();
        let local = PixelRect::new(1.0, 0.0, 1.0, 0.0);
        b.add_pivoted_quad(Vec2::ZERO, local, 90.0, Vec2::new(2.0, 1.0), local.into())
            .unwrap();
        assert_close(positions(&b)[0], [0.0, 2.0]);
    }

    #[test]
    fn rotated_quad_spins_about_dst_center() {
        let mut b = batch();
        let dst = PixelRect::new(0.0, 0.0, 4.0, 2.0);
        b.add_rotated_quad(dst, dst.into(), 180.0).unwrap();
        // A half turn about (2, 1) maps TL onto BR.
        assert_close(positions(&b)[0], [4.0, 2.0]);
        assert_close(positions(&b)[2], [0.0, 0.0]);
    }

    #[test]
    fn rotated_quad_at_zero_angle_matches_simple() {
        let dst = PixelRect::new(3.0, 5.0, 11.0, 9.0);
        let src: Source = PixelRect::new(0.0, 0.0, 8.0, 4.0).into();
        let mut rotated = batch();
        rotated.add_rotated_quad(dst, src, 0.0).unwrap();
        let mut simple = batch();
        simple.add_simple_quad(dst, src).unwrap();
        assert_eq!(rotated.uvs(), simple.uvs());
        for (a, b) in positions(&rotated).into_iter().zip(positions(&simple)) {
            assert_close(a, b);
        }
    }

    #[test]
    fn indices_chain_by_four_per_quad() {
        let mut b = batch();
        let r = PixelRect::new(0.0, 0.0, 1.0, 1.0);
        for _ in 0..3 {
            b.add_simple_quad(r, r.into()).unwrap();
        }
        assert_eq!(
            b.indices(),
            &[0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7, 8, 9, 10, 8, 10, 11]
        );
    }

    #[test]
    fn full_batch_reaches_top_index_and_rejects_next_quad() {
        let mut b = batch();
        let r = PixelRect::new(0.0, 0.0, 1.0, 1.0);
        for _ in 0..MAX_QUADS_PER_BATCH {
            b.add_simple_quad(r, r.into()).unwrap();
        }
        assert!(b.is_full());
        assert_eq!(b.indices().len(), 6 * MAX_QUADS_PER_BATCH);
        assert_eq!(b.indices()[b.indices().len() - 6..], [65532, 65533, 65534, 65532, 65534, 65535]);

        let err = b.add_simple_quad(r, r.into()).unwrap_err();
        assert!(matches!(err, BatchError::IndexOverflow { quads: MAX_QUADS_PER_BATCH, .. }));
        assert_eq!(b.quad_count(), MAX_QUADS_PER_BATCH);
    }

    #[test]
    fn every_index_sequence_matches_its_quad() {
        let mut b = batch();
        let r = PixelRect::new(0.0, 0.0, 1.0, 1.0);
        for _ in 0..MAX_QUADS_PER_BATCH {
            b.add_simple_quad(r, r.into()).unwrap();
        }
        for (k, chunk) in b.indices().chunks(6).enumerate() {
            let n = (4 * k) as u16;
            assert_eq!(chunk, [n, n + 1, n + 2, n, n + 2, n + 3], "quad {k}");
        }
    }

    #[test]
    fn clear_then_redraw_reproduces_buffers() {
        let draw = |b: &mut GeometryBatch| {
            b.add_simple_quad(PixelRect::new(0.0, 0.0, 8.0, 8.0), PixelRect::new(0.0, 0.0, 8.0, 8.0).into())
                .unwrap();
            b.add_rotated_quad(PixelRect::new(8.0, 8.0, 24.0, 16.0), PixelRect::new(8.0, 0.0, 16.0, 8.0).into(), 33.0)
                .unwrap();
            b.add_line_quad(Vec2::ZERO, Vec2::new(40.0, 30.0), 4.0, PixelRect::new(0.0, 0.0, 16.0, 4.0).into())
                .unwrap();
        };
        let mut b = batch();
        draw(&mut b);
        let first = (b.vertices().to_vec(), b.indices().to_vec(), b.uvs().to_vec());
        b.clear();
        assert!(b.is_empty());
        draw(&mut b);
        assert_eq!(first, (b.vertices().to_vec(), b.indices().to_vec(), b.uvs().to_vec()));
    }

    #[test]
    fn horizontal_line_is_offset_perpendicular() {
        let mut b = batch();
        b.add_line_quad(
            Vec2::new(0.0, 10.0),
            Vec2::new(50.0, 10.0),
            4.0,
            PixelRect::new(0.0, 0.0, 16.0, 8.0).into(),
        )
        .unwrap();
        let expected = [[0.0, 8.0], [0.0, 12.0], [50.0, 12.0], [50.0, 8.0]];
        for (actual, expected) in positions(&b).into_iter().zip(expected) {
            assert_close(actual, expected);
        }
    }

    #[test]
    fn line_uvs_repeat_along_length() {
        let mut b = batch();
        // Length 50, source 16 wide: floor(50 / 16) = 3 repeats.
        b.add_line_quad(
            Vec2::ZERO,
            Vec2::new(30.0, 40.0),
            2.0,
            PixelRect::new(0.0, 32.0, 16.0, 64.0).into(),
        )
        .unwrap();
        let uvs: Vec<[f32; 2]> = b.uvs().iter().map(|t| t.uv).collect();
        assert_eq!(
            uvs,
            vec![[0.0, 0.25], [0.0, 0.5], [3.0, 0.5], [3.0, 0.25]]
        );
    }

    #[test]
    fn zero_width_source_line_has_zero_u_span() {
        let mut b = batch();
        b.add_line_quad(Vec2::ZERO, Vec2::new(10.0, 0.0), 1.0, PixelRect::new(4.0, 0.0, 4.0, 8.0).into())
            .unwrap();
        assert!(b.uvs().iter().all(|t| t.uv[0] == 0.0));
    }

    #[test]
    fn tile_uvs_span_dst_over_scaled_src_plus_offset() {
        let mut b = batch();
        b.add_tile_quad(
            PixelRect::new(0.0, 0.0, 128.0, 64.0),
            Vec2::new(8.0, 16.0),
            2.0,
            PixelRect::new(0.0, 0.0, 32.0, 32.0).into(),
        )
        .unwrap();
        // span = (128, 64) / (32·2) = (2, 1); offset = (8, 16) / 32 = (0.25, 0.5)
        let uvs: Vec<[f32; 2]> = b.uvs().iter().map(|t| t.uv).collect();
        assert_eq!(
            uvs,
            vec![[0.25, 0.5], [0.25, 1.5], [2.25, 1.5], [2.25, 0.5]]
        );
        assert_eq!(
            positions(&b),
            vec![[0.0, 0.0], [0.0, 64.0], [128.0, 64.0], [128.0, 0.0]]
        );
    }

    #[test]
    fn degenerate_input_never_produces_nan_uvs() {
        let mut b = GeometryBatch::new(Tint::WHITE, UVec2::ZERO);
        let zero = PixelRect::default();
        b.add_simple_quad(zero, zero.into()).unwrap();
        b.add_tile_quad(zero, Vec2::ONE, 0.0, zero.into()).unwrap();
        b.add_rotated_quad(zero, zero.into(), f32::NAN).unwrap();
        assert_eq!(b.quad_count(), 3);
        assert!(b.uvs().iter().all(|t| t.uv.iter().all(|c| c.is_finite())));
    }
}
