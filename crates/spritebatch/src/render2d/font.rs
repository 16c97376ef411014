//! # Font — Glyph Atlas Built From a Typeface
//!
//! A font image is not loaded from disk as pixels. Instead the batcher asks a
//! [`Typeface`] to measure and draw every glyph in the configured character
//! ranges, and lays the results out in one power-of-two canvas. Text is then
//! drawn as one quad per character, sampling that canvas, so a whole string
//! goes through the same batching path as any sprite.
//!
//! ## Atlas Layout
//!
//! All cells share one size, derived from the widest glyph and the line
//! height:
//!
//! ```text
//!  cell_width  = max_advance + 2·pad_x
//!  cell_height = line_height + pad_y
//!
//!  ┌────┬────┬────┬────┬──  …  ─┐
//!  │ ␠  │ !  │ "  │ #  │        │   raster scan: left to right,
//!  ├────┼────┼────┼────┼──  …  ─┤   wrap when the next cell would
//!  │ …  │    │    │    │        │   cross the canvas edge
//!  └────┴────┴────┴────┴──  …  ─┘
//! ```
//!
//! The canvas edge is picked from a fixed ladder keyed on the larger cell
//! dimension (see [`canvas_size_for`]). This is a heuristic, not a packer:
//! sparse ranges waste space, and a range too large for its canvas loses the
//! glyphs that fall off the bottom (logged once). A cell that cannot fit even
//! the largest canvas is a layout error.
//!
//! Each glyph is drawn into a scratch image the size of its cell and then
//! copied into place, in placement order. Ink that overhangs the cell (italic
//! tails, negative bearings) is clipped instead of bleeding into neighbours.
//!
//! ## Text Quads
//!
//! [`GlyphAtlas::glyph_quads`] centers a string on an anchor using the sum of
//! per-glyph advances, then emits one pivoted quad per glyph with the whole
//! cell as its local rect. The cursor moves by the glyph's advance, not the
//! cell width, so cells overlap by their padding. Vertical centering uses the
//! cell height, so every glyph shares one line box.

use std::path::Path;

use image::{Rgba, RgbaImage, imageops};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::batch::Source;
use super::tint::Tint;
use crate::error::{BatchError, Result};
use crate::math::{PixelRect, UVec2, Vec2};

/// Measurement and rasterization for one loaded font.
///
/// Implementations assume simple left-to-right shaping: no kerning pairs, no
/// ligatures, no bidi.
pub trait Typeface {
    /// Horizontal advance of `ch` in pixels at `size`.
    fn advance(&self, ch: char, size: f32) -> f32;

    /// Distance from the top of the line box to the baseline.
    fn ascent(&self, size: f32) -> f32;

    /// Height of the line box (ascent plus descent).
    fn line_height(&self, size: f32) -> f32;

    /// Draw `ch` into `canvas` with its pen origin at `(x, baseline)`.
    /// Coverage becomes alpha, multiplied by `color`.
    ///
    /// The atlas hands each glyph a canvas exactly one cell in size, so
    /// implementations only need to skip pixels outside `canvas`.
    fn rasterize(&self, ch: char, size: f32, canvas: &mut RgbaImage, x: i32, baseline: i32, color: Tint);
}

/// Loads typefaces for font images at realization time.
pub trait TypefaceSource {
    fn load_typeface(&self, path: &Path, size: f32) -> Result<Box<dyn Typeface>>;
}

/// An inclusive range of code points to put in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    pub start: u32,
    pub end: u32,
}

impl CharRange {
    /// Printable ASCII, space through tilde.
    pub const ASCII: Self = Self::new(32, 126);
    /// Hiragana and katakana.
    pub const JAPANESE_KANA: Self = Self::new(12352, 12543);

    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Valid `char`s in the range; surrogates and out-of-range values are skipped.
    pub fn chars(&self) -> impl Iterator<Item = char> {
        (self.start..=self.end).filter_map(char::from_u32)
    }
}

/// Immutable settings for one font image.
///
/// Every field has a default, so a JSON config only needs the fields it
/// changes. Adjusting a value produces a new config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Pixel size glyphs are rasterized at.
    pub size: f32,
    /// Color glyph coverage is painted with. Usually white, so draw tints apply cleanly.
    pub tint: Tint,
    /// Horizontal padding on each side of a cell.
    pub pad_x: u32,
    /// Vertical padding below the line box.
    pub pad_y: u32,
    /// Substituted for characters outside every range.
    pub unknown: char,
    pub ranges: Vec<CharRange>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            size: 24.0,
            tint: Tint::WHITE,
            pad_x: 2,
            pad_y: 2,
            unknown: ' ',
            ranges: vec![CharRange::ASCII],
        }
    }
}

impl FontConfig {
    /// A copy with `range` appended after the existing ranges.
    pub fn with_range(&self, range: CharRange) -> Self {
        let mut next = self.clone();
        next.ranges.push(range);
        next
    }

    /// Every code point to rasterize, in range order. Overlapping ranges
    /// repeat code points.
    pub fn code_points(&self) -> impl Iterator<Item = char> + '_ {
        self.ranges.iter().flat_map(CharRange::chars)
    }
}

/// Largest canvas edge on the ladder.
pub const MAX_CANVAS_SIZE: u32 = 4096;

/// Canvas edge for a given cell size.
pub fn canvas_size_for(max_cell_dim: u32) -> u32 {
    match max_cell_dim {
        0..=24 => 256,
        25..=40 => 512,
        41..=80 => 1024,
        81..=160 => 2048,
        _ => MAX_CANVAS_SIZE,
    }
}

/// Where one glyph lives in the atlas and how far it moves the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub advance: u32,
    pub rect: PixelRect,
}

/// One glyph of laid-out text, ready for
/// [`GeometryBatch::add_pivoted_quad`](super::batch::GeometryBatch::add_pivoted_quad).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub pivot: Vec2,
    pub local: PixelRect,
    pub source: Source,
}

/// Finished glyph layout. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphAtlas {
    canvas_size: u32,
    cell: UVec2,
    pad_x: u32,
    ascent: u32,
    /// Placement order.
    glyphs: IndexMap<char, GlyphMetrics>,
    unknown: Option<GlyphMetrics>,
}

impl GlyphAtlas {
    /// Measure every configured glyph and assign it a cell.
    ///
    /// Fails with [`BatchError::Config`] when the padded cell is empty or
    /// larger than [`MAX_CANVAS_SIZE`].
    pub fn layout(typeface: &dyn Typeface, config: &FontConfig) -> Result<Self> {
        let measured: Vec<(char, u32)> = config
            .code_points()
            .map(|ch| (ch, typeface.advance(ch, config.size).ceil().max(0.0) as u32))
            .collect();
        let max_advance = measured.iter().map(|&(_, w)| w).max().unwrap_or(0);
        let line_height = typeface.line_height(config.size).ceil().max(0.0) as u32;

        let cell = max_advance
            .checked_add(config.pad_x.saturating_mul(2))
            .zip(line_height.checked_add(config.pad_y))
            .map(|(w, h)| UVec2::new(w, h))
            .filter(|c| c.min_element() > 0 && c.max_element() <= MAX_CANVAS_SIZE)
            .ok_or_else(|| {
                BatchError::Config(format!(
                    "glyph cell for advance {max_advance}, line height {line_height}, padding {}/{} \
                     does not fit a {MAX_CANVAS_SIZE}px canvas",
                    config.pad_x, config.pad_y
                ))
            })?;
        let canvas_size = canvas_size_for(cell.max_element());

        let mut glyphs = IndexMap::with_capacity(measured.len());
        let mut dropped = 0usize;
        let (mut x, mut y) = (0u32, 0u32);
        for (ch, advance) in measured {
            if y + cell.y > canvas_size {
                dropped += 1;
                continue;
            }
            let rect = PixelRect::new(x as f32, y as f32, (x + cell.x) as f32, (y + cell.y) as f32);
            glyphs.insert(ch, GlyphMetrics { advance, rect });

            x += cell.x;
            if x + cell.x > canvas_size {
                x = 0;
                y += cell.y;
            }
        }
        if dropped > 0 {
            log::warn!(
                "Glyph atlas overflow: {dropped} glyphs did not fit a {canvas_size}×{canvas_size} canvas"
            );
        }

        let unknown = glyphs.get(&config.unknown).copied();
        if unknown.is_none() {
            log::warn!(
                "Fallback glyph U+{:04X} is not in the atlas; unknown characters will be skipped",
                config.unknown as u32
            );
        }

        Ok(Self {
            canvas_size,
            cell,
            pad_x: config.pad_x,
            ascent: typeface.ascent(config.size).ceil().max(0.0) as u32,
            glyphs,
            unknown,
        })
    }

    /// Draw every placed glyph into a fresh transparent canvas, each one
    /// clipped to its own cell.
    pub fn rasterize(&self, typeface: &dyn Typeface, config: &FontConfig) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.canvas_size, self.canvas_size);
        let mut scratch = RgbaImage::new(self.cell.x, self.cell.y);
        for (&ch, glyph) in &self.glyphs {
            scratch.pixels_mut().for_each(|px| *px = Rgba([0, 0, 0, 0]));
            typeface.rasterize(
                ch,
                config.size,
                &mut scratch,
                self.pad_x as i32,
                self.ascent as i32,
                config.tint,
            );
            imageops::replace(&mut canvas, &scratch, glyph.rect.left as i64, glyph.rect.top as i64);
        }
        canvas
    }

    /// Lay out and rasterize in one go.
    pub fn build(typeface: &dyn Typeface, config: &FontConfig) -> Result<(Self, RgbaImage)> {
        let atlas = Self::layout(typeface, config)?;
        let canvas = atlas.rasterize(typeface, config);
        log::debug!(
            "Built glyph atlas: {} glyphs, {}×{} cells, {}px canvas",
            atlas.glyphs.len(),
            atlas.cell.x,
            atlas.cell.y,
            atlas.canvas_size
        );
        Ok((atlas, canvas))
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    pub fn cell_size(&self) -> UVec2 {
        self.cell
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Metrics for `ch`, falling back to the unknown glyph.
    pub fn glyph(&self, ch: char) -> Option<&GlyphMetrics> {
        self.glyphs.get(&ch).or(self.unknown.as_ref())
    }

    /// Sum of advances for `text`, in unscaled pixels.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|ch| self.glyph(ch))
            .map(|g| g.advance as f32)
            .sum()
    }

    /// One quad per drawable character of `text`, centered on `anchor`.
    pub fn glyph_quads(&self, text: &str, anchor: Vec2, scale: f32) -> Vec<GlyphQuad> {
        let total = self.text_width(text);
        let mut x = anchor.x - (self.pad_x as f32 + total / 2.0) * scale;
        let y = anchor.y - self.cell.y as f32 * scale / 2.0;
        let local = PixelRect::new(0.0, 0.0, self.cell.x as f32, self.cell.y as f32);

        let mut quads = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let Some(glyph) = self.glyph(ch) else {
                continue;
            };
            quads.push(GlyphQuad {
                pivot: Vec2::new(x, y),
                local,
                source: Source::new(glyph.rect).with_inset(true),
            });
            x += glyph.advance as f32 * scale;
        }
        quads
    }
}

// ── fontdue ─────────────────────────────────────────────────────────────

/// [`Typeface`] backed by [fontdue](https://docs.rs/fontdue).
#[cfg(feature = "text")]
pub struct FontdueTypeface {
    font: fontdue::Font,
}

#[cfg(feature = "text")]
impl FontdueTypeface {
    /// Parse a TTF/OTF file's bytes, optimized for rasterizing at `size`.
    pub fn from_bytes(data: &[u8], size: f32) -> std::result::Result<Self, String> {
        let font = fontdue::Font::from_bytes(
            data,
            fontdue::FontSettings {
                scale: size,
                ..Default::default()
            },
        )?;
        Ok(Self { font })
    }
}

/// `(ascent, line_height)`; fonts without horizontal metrics use `size` for both.
#[cfg(feature = "text")]
fn line_box(metrics: Option<fontdue::LineMetrics>, size: f32) -> (f32, f32) {
    match metrics {
        Some(m) => (m.ascent, m.ascent - m.descent),
        None => (size, size),
    }
}

/// Canvas position of a bitmap's top-left pixel.
///
/// fontdue's `ymin` is the bitmap's bottom edge relative to the baseline
/// (y-up); the canvas is y-down.
#[cfg(feature = "text")]
fn bitmap_origin(xmin: i32, ymin: i32, height: usize, x: i32, baseline: i32) -> (i32, i32) {
    (x + xmin, baseline - (height as i32 + ymin))
}

/// Write a row-major coverage bitmap at `(left, top)`. Zero coverage and
/// pixels outside `canvas` are skipped.
#[cfg(feature = "text")]
fn blit_coverage(canvas: &mut RgbaImage, left: i32, top: i32, width: usize, bitmap: &[u8], color: Tint) {
    if width == 0 {
        return;
    }
    let [r, g, b, a] = color.to_rgba().map(|c| (c * 255.0).round() as u8);
    for (i, &coverage) in bitmap.iter().enumerate() {
        if coverage == 0 {
            continue;
        }
        let (px, py) = (left + (i % width) as i32, top + (i / width) as i32);
        if px < 0 || py < 0 || px as u32 >= canvas.width() || py as u32 >= canvas.height() {
            continue;
        }
        let alpha = (coverage as u32 * a as u32 / 255) as u8;
        canvas.put_pixel(px as u32, py as u32, Rgba([r, g, b, alpha]));
    }
}

#[cfg(feature = "text")]
impl Typeface for FontdueTypeface {
    fn advance(&self, ch: char, size: f32) -> f32 {
        self.font.metrics(ch, size).advance_width
    }

    fn ascent(&self, size: f32) -> f32 {
        line_box(self.font.horizontal_line_metrics(size), size).0
    }

    fn line_height(&self, size: f32) -> f32 {
        line_box(self.font.horizontal_line_metrics(size), size).1
    }

    fn rasterize(&self, ch: char, size: f32, canvas: &mut RgbaImage, x: i32, baseline: i32, color: Tint) {
        let (metrics, bitmap) = self.font.rasterize(ch, size);
        if metrics.width == 0 || metrics.height == 0 {
            return;
        }
        let (left, top) = bitmap_origin(metrics.xmin, metrics.ymin, metrics.height, x, baseline);
        blit_coverage(canvas, left, top, metrics.width, &bitmap, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTypeface;

    fn ascii_atlas() -> GlyphAtlas {
        GlyphAtlas::layout(&FakeTypeface::default(), &FontConfig::default()).unwrap()
    }

    #[test]
    fn canvas_ladder_boundaries() {
        assert_eq!(canvas_size_for(24), 256);
        assert_eq!(canvas_size_for(25), 512);
        assert_eq!(canvas_size_for(40), 512);
        assert_eq!(canvas_size_for(41), 1024);
        assert_eq!(canvas_size_for(80), 1024);
        assert_eq!(canvas_size_for(160), 2048);
        assert_eq!(canvas_size_for(161), 4096);
    }

    #[test]
    fn cell_size_uses_widest_glyph_and_padding() {
        // FakeTypeface: widest advance is 'W' at 14, line height 16.
        let atlas = ascii_atlas();
        assert_eq!(atlas.cell_size(), UVec2::new(14 + 2 * 2, 16 + 2));
        // max(18, 18) = 18 → 256.
        assert_eq!(atlas.canvas_size(), 256);
    }

    #[test]
    fn raster_scan_places_cells_left_to_right_then_wraps() {
        let atlas = ascii_atlas();
        let (cw, ch) = (18.0, 18.0);
        assert_eq!(atlas.glyph(' ').unwrap().rect, PixelRect::new(0.0, 0.0, cw, ch));
        assert_eq!(atlas.glyph('!').unwrap().rect, PixelRect::new(cw, 0.0, 2.0 * cw, ch));

        // 256 / 18 = 14 cells per row (14·18 = 252, a 15th would end at 270).
        let fifteenth = char::from_u32(32 + 14).unwrap();
        assert_eq!(atlas.glyph(fifteenth).unwrap().rect, PixelRect::new(0.0, ch, cw, 2.0 * ch));
    }

    #[test]
    fn layout_is_deterministic() {
        let config = FontConfig::default().with_range(CharRange::JAPANESE_KANA);
        let a = GlyphAtlas::layout(&FakeTypeface::default(), &config).unwrap();
        let b = GlyphAtlas::layout(&FakeTypeface::default(), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn glyphs_that_fall_off_the_canvas_are_dropped() {
        // 95 + 192 glyphs of 18×18 cells need more than 256px of rows.
        let config = FontConfig::default().with_range(CharRange::JAPANESE_KANA);
        let atlas = GlyphAtlas::layout(&FakeTypeface::default(), &config).unwrap();
        // 14 per row, 14 rows fit in 256px.
        assert_eq!(atlas.len(), 14 * 14);
        assert!(atlas.glyphs.values().all(|g| g.rect.bottom <= 256.0));
    }

    #[test]
    fn surrogate_code_points_are_skipped() {
        let range = CharRange::new(0xD7FF, 0xE000);
        let chars: Vec<char> = range.chars().collect();
        assert_eq!(chars, vec!['\u{D7FF}', '\u{E000}']);
    }

    #[test]
    fn unknown_characters_use_fallback_glyph() {
        let config = FontConfig {
            unknown: '?',
            ..FontConfig::default()
        };
        let atlas = GlyphAtlas::layout(&FakeTypeface::default(), &config).unwrap();
        assert_eq!(atlas.glyph('é'), atlas.glyph('?'));
    }

    #[test]
    fn missing_fallback_skips_unknown_characters() {
        let config = FontConfig {
            unknown: '\u{1F600}',
            ..FontConfig::default()
        };
        let atlas = GlyphAtlas::layout(&FakeTypeface::default(), &config).unwrap();
        assert!(atlas.glyph('é').is_none());
        assert_eq!(atlas.glyph_quads("aéb", Vec2::ZERO, 1.0).len(), 2);
    }

    #[test]
    fn hi_is_centered_on_anchor() {
        let atlas = ascii_atlas();
        let total = atlas.glyph('H').unwrap().advance + atlas.glyph('i').unwrap().advance;
        let quads = atlas.glyph_quads("Hi", Vec2::new(100.0, 50.0), 1.0);
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].pivot.x, 100.0 - 2.0 - total as f32 / 2.0);
        assert_eq!(quads[0].pivot.y, 50.0 - 18.0 / 2.0);
        assert_eq!(quads[1].pivot.x, quads[0].pivot.x + atlas.glyph('H').unwrap().advance as f32);
    }

    #[test]
    fn cursor_advance_scales() {
        let atlas = ascii_atlas();
        let quads = atlas.glyph_quads("HH", Vec2::ZERO, 2.0);
        let advance = atlas.glyph('H').unwrap().advance as f32;
        assert_eq!(quads[1].pivot.x - quads[0].pivot.x, advance * 2.0);
    }

    #[test]
    fn glyph_sources_are_inset() {
        let atlas = ascii_atlas();
        let quads = atlas.glyph_quads("A", Vec2::ZERO, 1.0);
        assert_eq!(quads[0].source, Source::new(atlas.glyph('A').unwrap().rect).with_inset(true));
    }

    #[test]
    fn rasterize_paints_inside_cells_only() {
        let config = FontConfig::default();
        let typeface = FakeTypeface::default();
        let (atlas, canvas) = GlyphAtlas::build(&typeface, &config).unwrap();
        assert_eq!(canvas.dimensions(), (256, 256));

        let a = atlas.glyph('A').unwrap().rect;
        let inside = canvas.get_pixel(a.left as u32 + 2, a.top as u32 + 1);
        assert_eq!(inside.0[3], 255);
        // The bottom padding row of a cell stays transparent.
        let padding = canvas.get_pixel(a.left as u32 + 2, a.bottom as u32 - 1);
        assert_eq!(padding.0[3], 0);
    }

    /// Ink starts 3px left of the pen (a negative bearing) and the glyph
    /// clears a 6px margin around its box, like a rasterizer that writes
    /// zero coverage.
    struct SpillingTypeface;

    impl Typeface for SpillingTypeface {
        fn advance(&self, _ch: char, _size: f32) -> f32 {
            8.0
        }

        fn ascent(&self, _size: f32) -> f32 {
            12.0
        }

        fn line_height(&self, _size: f32) -> f32 {
            16.0
        }

        fn rasterize(&self, _ch: char, _size: f32, canvas: &mut RgbaImage, x: i32, baseline: i32, _color: Tint) {
            let top = baseline - 12;
            for py in top - 6..top + 16 + 6 {
                for px in x - 9..x + 8 + 6 {
                    if px < 0 || py < 0 || px as u32 >= canvas.width() || py as u32 >= canvas.height() {
                        continue;
                    }
                    let ink = (x - 3..x + 8).contains(&px) && (top..top + 16).contains(&py);
                    let alpha = if ink { 255 } else { 0 };
                    canvas.put_pixel(px as u32, py as u32, Rgba([255, 255, 255, alpha]));
                }
            }
        }
    }

    #[test]
    fn overhanging_glyphs_stay_in_their_cells() {
        let config = FontConfig::default();
        let (atlas, canvas) = GlyphAtlas::build(&SpillingTypeface, &config).unwrap();
        assert_eq!(atlas.cell_size(), UVec2::new(12, 18));

        for ch in "ABCDEFG".chars() {
            let rect = atlas.glyph(ch).unwrap().rect;
            let (left, top) = (rect.left as u32, rect.top as u32);
            // Own ink survives the neighbours' cleared margins.
            assert_eq!(canvas.get_pixel(left, top).0[3], 255, "{ch} left edge");
            assert_eq!(canvas.get_pixel(left + 9, top).0[3], 255, "{ch} right ink");
            // The next glyph's overhang is clipped at its own cell.
            assert_eq!(canvas.get_pixel(left + 11, top).0[3], 0, "{ch} right padding");
        }
    }

    #[test]
    fn rebuilding_gives_identical_canvases() {
        let config = FontConfig::default().with_range(CharRange::new(0xA1, 0xFF));
        let (_, first) = GlyphAtlas::build(&SpillingTypeface, &config).unwrap();
        for _ in 0..4 {
            let (_, next) = GlyphAtlas::build(&SpillingTypeface, &config).unwrap();
            assert!(first.as_raw() == next.as_raw());
        }
    }

    #[test]
    fn oversized_padding_is_a_config_error() {
        let config: FontConfig = serde_json::from_str(r#"{ "pad_x": 3000000000 }"#).unwrap();
        let err = GlyphAtlas::layout(&FakeTypeface::default(), &config).unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));

        let tall = FontConfig {
            pad_y: MAX_CANVAS_SIZE,
            ..FontConfig::default()
        };
        assert!(GlyphAtlas::layout(&FakeTypeface::default(), &tall).is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: FontConfig = serde_json::from_str(r#"{ "size": 32.0, "pad_x": 4 }"#).unwrap();
        assert_eq!(config.size, 32.0);
        assert_eq!(config.pad_x, 4);
        assert_eq!(config.pad_y, 2);
        assert_eq!(config.ranges, vec![CharRange::ASCII]);
        assert_eq!(config.unknown, ' ');
    }
}
