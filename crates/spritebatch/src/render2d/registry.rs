//! # Registry — The Public Drawing Surface
//!
//! [`SpriteBatcher`] owns every registered image and, per image, the tint
//! groups that accumulate this frame's geometry. A frame has two phases:
//!
//! ```text
//!  draw phase                          flush phase
//!  ──────────                          ───────────
//!  draw(id, dst, src)                  for image in registration order
//!    └► entry for id                     for group in (default, tints…)
//!        └► tint group for tint            for batch in generations
//!            └► batch.add_*_quad()           backend.submit_draw(batch)
//!                                        clear every batch
//! ```
//!
//! Registration order is layering order: images registered first are drawn
//! first, so later images appear on top regardless of the order draw calls
//! were made in. Use [`SpriteBatcher::flush_now`] to force geometry out
//! mid-frame when interleaving matters.
//!
//! ## Lifecycle
//!
//! Images are registered during setup with an [`ImageSource`]. Nothing is
//! loaded until [`SpriteBatcher::realize`], which decodes pixels (or builds a
//! glyph atlas), uploads them, and records the pixel size used to normalize
//! UVs. An image that fails to realize stays failed for the session.
//!
//! ## Errors
//!
//! Setup calls return [`Result`]. Draw calls never fail outward: a draw
//! against an unknown, unrealized or full image is dropped and logged, once
//! at `warn` per image and error kind, then at `trace`.

use std::collections::HashSet;
use std::mem::Discriminant;
use std::path::PathBuf;

use indexmap::IndexMap;

use super::batch::{GeometryBatch, Source};
use super::font::{CharRange, FontConfig, GlyphAtlas, TypefaceSource};
use super::texture::{self, ArchiveRef, ImageId, ImageSource, PixelSource};
use super::tint::{Tint, TintGroups};
use crate::config::{BatcherConfig, OverflowPolicy};
use crate::error::{BatchError, Result};
use crate::math::{PixelRect, UVec2, Vec2};
use crate::render::{DrawCall, RenderBackend, TextureHandle};

/// What one flush handed to the backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub draw_calls: usize,
    pub quads: usize,
}

/// Font settings that can be changed together before realization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontParameters {
    pub size: f32,
    pub tint: Tint,
    pub pad_x: u32,
    pub pad_y: u32,
    pub unknown: char,
}

impl Default for FontParameters {
    fn default() -> Self {
        let config = FontConfig::default();
        Self {
            size: config.size,
            tint: config.tint,
            pad_x: config.pad_x,
            pad_y: config.pad_y,
            unknown: config.unknown,
        }
    }
}

enum RealizeState {
    Pending,
    Ready {
        handle: TextureHandle,
        size: UVec2,
        atlas: Option<GlyphAtlas>,
    },
    Failed(String),
}

/// One registered image and its pending geometry.
pub struct ImageEntry {
    id: ImageId,
    source: ImageSource,
    state: RealizeState,
    groups: TintGroups,
}

impl ImageEntry {
    fn new(id: ImageId, source: ImageSource) -> Self {
        Self {
            id,
            source,
            state: RealizeState::Pending,
            groups: TintGroups::new(),
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn is_realized(&self) -> bool {
        matches!(self.state, RealizeState::Ready { .. })
    }

    /// Why realization failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            RealizeState::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Pixel size, known once realized.
    pub fn size(&self) -> Option<UVec2> {
        match self.state {
            RealizeState::Ready { size, .. } => Some(size),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        match self.state {
            RealizeState::Ready { handle, .. } => Some(handle),
            _ => None,
        }
    }

    pub fn atlas(&self) -> Option<&GlyphAtlas> {
        match &self.state {
            RealizeState::Ready { atlas, .. } => atlas.as_ref(),
            _ => None,
        }
    }

    pub fn groups(&self) -> &TintGroups {
        &self.groups
    }

    /// Quads waiting for the next flush, across all tints.
    pub fn quad_count(&self) -> usize {
        self.groups.iter().map(|g| g.quad_count()).sum()
    }

    fn font_config_mut(&mut self) -> Result<&mut FontConfig> {
        if !matches!(self.state, RealizeState::Pending) {
            return Err(BatchError::Config(format!(
                "{} is already realized; font settings are fixed",
                self.id
            )));
        }
        match &mut self.source {
            ImageSource::Font { config, .. } => Ok(config),
            _ => Err(BatchError::Config(format!("{} is not a font", self.id))),
        }
    }

    fn open_batch(&mut self, tint: Tint, policy: OverflowPolicy) -> Result<(&mut GeometryBatch, bool)> {
        let RealizeState::Ready { size, atlas, .. } = &self.state else {
            return Err(BatchError::NotRealized(self.id));
        };
        let font = atlas.is_some();
        let batch = self.groups.group_for(tint, *size).open_batch(policy)?;
        Ok((batch, font))
    }

    fn draw_text(&mut self, text: &str, anchor: Vec2, scale: f32, tint: Tint, policy: OverflowPolicy) -> Result<()> {
        let RealizeState::Ready { size, atlas, .. } = &self.state else {
            return Err(BatchError::NotRealized(self.id));
        };
        let Some(atlas) = atlas else {
            return Err(BatchError::Config(format!("{} is not a font", self.id)));
        };

        let group = self.groups.group_for(tint, *size);
        for glyph in atlas.glyph_quads(text, anchor, scale) {
            group
                .open_batch(policy)?
                .add_pivoted_quad(glyph.pivot, glyph.local, 0.0, Vec2::splat(scale), glyph.source)?;
        }
        Ok(())
    }
}

/// Draws against glyph atlases always sample inside the cell.
fn fit(src: Source, font: bool) -> Source {
    if font { src.prefer_inset() } else { src }
}

/// Registered images, in layering order, plus their per-frame batches.
pub struct SpriteBatcher {
    config: BatcherConfig,
    entries: IndexMap<ImageId, ImageEntry>,
    /// Draw failures already logged at `warn`. Unknown ids share one key so
    /// the set stays bounded by the registry size.
    reported: HashSet<(Option<ImageId>, Discriminant<BatchError>)>,
    frames: u64,
}

impl Default for SpriteBatcher {
    fn default() -> Self {
        Self::new(BatcherConfig::default())
    }
}

impl SpriteBatcher {
    pub fn new(config: BatcherConfig) -> Self {
        Self {
            config,
            entries: IndexMap::new(),
            reported: HashSet::new(),
            frames: 0,
        }
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    // ── Setup ───────────────────────────────────────────────────────────

    /// Register an image. Registration order is draw order at flush.
    pub fn register(&mut self, id: ImageId, source: ImageSource) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(BatchError::Config(format!("{id} is already registered")));
        }
        log::debug!("Registered {id}: {}", source.label());
        self.entries.insert(id, ImageEntry::new(id, source));
        Ok(())
    }

    pub fn register_image(&mut self, id: ImageId, path: impl Into<PathBuf>) -> Result<()> {
        self.register(id, ImageSource::file(path))
    }

    pub fn register_archive(
        &mut self,
        id: ImageId,
        entry: impl Into<String>,
        main_version: u32,
        patch_version: u32,
    ) -> Result<()> {
        self.register(
            id,
            ImageSource::Archive(ArchiveRef {
                entry: entry.into(),
                main_version,
                patch_version,
            }),
        )
    }

    pub fn register_font(&mut self, id: ImageId, path: impl Into<PathBuf>, config: FontConfig) -> Result<()> {
        self.register(id, ImageSource::font(path, config))
    }

    /// Add an inclusive code point range to a font. Before realization only.
    pub fn set_character_range(&mut self, id: ImageId, start: u32, end: u32) -> Result<()> {
        let config = self.entry_mut(id)?.font_config_mut()?;
        *config = config.with_range(CharRange::new(start, end));
        Ok(())
    }

    /// Replace a font's size, tint, padding and fallback character, keeping
    /// its ranges. Before realization only.
    pub fn set_font_parameters(&mut self, id: ImageId, params: FontParameters) -> Result<()> {
        let config = self.entry_mut(id)?.font_config_mut()?;
        *config = FontConfig {
            size: params.size,
            tint: params.tint,
            pad_x: params.pad_x,
            pad_y: params.pad_y,
            unknown: params.unknown,
            ranges: std::mem::take(&mut config.ranges),
        };
        Ok(())
    }

    /// Replace a font's whole config. Before realization only.
    pub fn set_font_config(&mut self, id: ImageId, config: FontConfig) -> Result<()> {
        *self.entry_mut(id)?.font_config_mut()? = config;
        Ok(())
    }

    /// Load, build and upload every image that has not been realized yet.
    ///
    /// Failures are logged and returned; the failing image becomes a
    /// permanent no-op and the rest carry on. Calling this again only
    /// touches images registered since.
    pub fn realize(
        &mut self,
        pixels: &dyn PixelSource,
        typefaces: &dyn TypefaceSource,
        backend: &mut dyn RenderBackend,
    ) -> Vec<BatchError> {
        let mut failures = Vec::new();
        for (&id, entry) in self.entries.iter_mut() {
            if !matches!(entry.state, RealizeState::Pending) {
                continue;
            }
            let label = entry.source.label();
            let result = texture::realize(id, &entry.source, pixels, typefaces).and_then(|realized| {
                let handle = backend.upload_texture(&label, &realized.pixels)?;
                let (w, h) = realized.pixels.dimensions();
                log::info!("Realized {id} ({label}) at {w}×{h}");
                Ok(RealizeState::Ready {
                    handle,
                    size: UVec2::new(w, h),
                    atlas: realized.atlas,
                })
            });
            match result {
                Ok(state) => entry.state = state,
                Err(err) => {
                    log::error!("Failed to realize {id} ({label}): {err}");
                    entry.state = RealizeState::Failed(err.to_string());
                    failures.push(err);
                }
            }
        }
        failures
    }

    /// [`realize`](Self::realize) against the filesystem roots in the config.
    #[cfg(feature = "text")]
    pub fn realize_files(&mut self, backend: &mut dyn RenderBackend) -> Vec<BatchError> {
        let assets = texture::FileAssets::from_config(&self.config);
        self.realize(&assets, &assets, backend)
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn resolve(&self, id: ImageId) -> Result<&ImageEntry> {
        self.entries.get(&id).ok_or(BatchError::UnknownResource(id))
    }

    fn entry_mut(&mut self, id: ImageId) -> Result<&mut ImageEntry> {
        self.entries.get_mut(&id).ok_or(BatchError::UnknownResource(id))
    }

    /// The batch that will take the next quad for `(id, tint)`, created on
    /// first use.
    pub fn batch_for(&mut self, id: ImageId, tint: Tint) -> Result<&mut GeometryBatch> {
        let policy = self.config.overflow;
        let (batch, _) = self.entry_mut(id)?.open_batch(tint, policy)?;
        Ok(batch)
    }

    /// Registered images in layering order.
    pub fn entries(&self) -> impl Iterator<Item = &ImageEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Quads waiting for the next flush, across all images.
    pub fn pending_quads(&self) -> usize {
        self.entries.values().map(ImageEntry::quad_count).sum()
    }

    /// Completed end-of-frame flushes.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    fn draw_with(&mut self, id: ImageId, tint: Tint, add: impl FnOnce(&mut GeometryBatch, bool) -> Result<()>) {
        let policy = self.config.overflow;
        let result = match self.entries.get_mut(&id) {
            Some(entry) => entry
                .open_batch(tint, policy)
                .and_then(|(batch, font)| add(batch, font)),
            None => Err(BatchError::UnknownResource(id)),
        };
        if let Err(err) = result {
            self.absorb(id, err);
        }
    }

    fn absorb(&mut self, id: ImageId, err: BatchError) {
        let key = match &err {
            BatchError::UnknownResource(_) => None,
            _ => Some(id),
        };
        if self.reported.insert((key, std::mem::discriminant(&err))) {
            log::warn!("Dropped draw for {id}: {err}");
        } else {
            log::trace!("Dropped draw for {id}: {err}");
        }
    }

    /// Draw `src` of the image stretched over `dst`, untinted.
    pub fn draw(&mut self, id: ImageId, dst: PixelRect, src: impl Into<Source>) {
        self.draw_tinted(id, dst, src, Tint::WHITE);
    }

    pub fn draw_tinted(&mut self, id: ImageId, dst: PixelRect, src: impl Into<Source>, tint: Tint) {
        let src = src.into();
        self.draw_with(id, tint, |batch, font| batch.add_simple_quad(dst, fit(src, font)));
    }

    /// Draw `dst` rotated by `degrees` about its center.
    pub fn draw_rotated(&mut self, id: ImageId, dst: PixelRect, src: impl Into<Source>, degrees: f32, tint: Tint) {
        let src = src.into();
        self.draw_with(id, tint, |batch, font| {
            batch.add_rotated_quad(dst, fit(src, font), degrees)
        });
    }

    /// Draw `local` scaled, rotated by `degrees`, then moved to `pivot`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_pivoted(
        &mut self,
        id: ImageId,
        pivot: Vec2,
        local: PixelRect,
        degrees: f32,
        scale: Vec2,
        src: impl Into<Source>,
        tint: Tint,
    ) {
        let src = src.into();
        self.draw_with(id, tint, |batch, font| {
            batch.add_pivoted_quad(pivot, local, degrees, scale, fit(src, font))
        });
    }

    /// Draw a strip `thickness` wide from `p1` to `p2`, repeating `src`
    /// along its length.
    pub fn draw_line(
        &mut self,
        id: ImageId,
        p1: Vec2,
        p2: Vec2,
        thickness: f32,
        src: impl Into<Source>,
        tint: Tint,
    ) {
        let src = src.into();
        self.draw_with(id, tint, |batch, font| {
            batch.add_line_quad(p1, p2, thickness, fit(src, font))
        });
    }

    /// Fill `dst` with `src` tiled at `scale`, scrolled by `offset` pixels.
    pub fn draw_tile(
        &mut self,
        id: ImageId,
        dst: PixelRect,
        offset: Vec2,
        scale: f32,
        src: impl Into<Source>,
        tint: Tint,
    ) {
        let src = src.into();
        self.draw_with(id, tint, |batch, font| {
            batch.add_tile_quad(dst, offset, scale, fit(src, font))
        });
    }

    /// Draw `text` with a font image, centered on `anchor`.
    pub fn draw_text(&mut self, id: ImageId, text: &str, anchor: Vec2, scale: f32, tint: Tint) {
        let policy = self.config.overflow;
        let result = match self.entries.get_mut(&id) {
            Some(entry) => entry.draw_text(text, anchor, scale, tint, policy),
            None => Err(BatchError::UnknownResource(id)),
        };
        if let Err(err) = result {
            self.absorb(id, err);
        }
    }

    /// Append one quad whose corners and UVs are already final.
    pub fn add_quad(&mut self, id: ImageId, corners: [Vec2; 4], uvs: [Vec2; 4], tint: Tint) {
        self.draw_with(id, tint, |batch, _| batch.add_quad(corners, uvs));
    }

    // ── Flushing ────────────────────────────────────────────────────────

    fn submit_all(&mut self, backend: &mut dyn RenderBackend) -> FlushStats {
        let mut stats = FlushStats::default();
        for entry in self.entries.values_mut() {
            let Some(handle) = entry.handle() else {
                continue;
            };
            for group in entry.groups.iter() {
                for batch in group.batches() {
                    backend.submit_draw(&DrawCall::from_batch(handle, batch));
                    stats.draw_calls += 1;
                    stats.quads += batch.quad_count();
                }
            }
            entry.groups.clear();
        }
        stats
    }

    /// Submit everything drawn this frame and clear for the next one.
    pub fn flush(&mut self, backend: &mut dyn RenderBackend) -> FlushStats {
        let stats = self.submit_all(backend);
        self.frames += 1;
        log::trace!(
            "Frame {}: {} draw calls, {} quads",
            self.frames,
            stats.draw_calls,
            stats.quads
        );
        stats
    }

    /// Submit everything drawn so far without ending the frame. Later draws
    /// start fresh batches and are submitted after these.
    pub fn flush_now(&mut self, backend: &mut dyn RenderBackend) -> FlushStats {
        self.submit_all(backend)
    }
}
