//! # Tint — Per-Batch Color Multiplier
//!
//! Every batch carries exactly one tint. The backend multiplies each texture
//! sample by it, so a white tint leaves the image untouched. Drawing the same
//! image with two tints therefore costs two draw submissions.
//!
//! ## Directory Layout
//!
//! ```text
//! TintGroups (one per image)
//! ┌─────────────────────────────────────────────┐
//! │ default: Option<TintGroup>   ◄── 0xFFFFFFFF │
//! │ tinted:  IndexMap<Tint, TintGroup>          │
//! │   0xFFFF0000 → TintGroup                    │
//! │   0x8000FF00 → TintGroup                    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The untinted case is the common one, so it lives in its own slot and never
//! touches the map. Non-default tints keep first-use order, which makes flush
//! order stable frame to frame.
//!
//! ## Generations
//!
//! A [`TintGroup`] holds a chain of [`GeometryBatch`]es. Normally only the
//! first is used. When the active batch reaches the 16-bit index ceiling and
//! the policy is [`OverflowPolicy::Split`], the group moves on to the next
//! generation; each generation becomes its own draw submission. Generations
//! are cleared, not dropped, after a flush so their capacity is reused.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::batch::{GeometryBatch, MAX_QUADS_PER_BATCH};
use crate::config::OverflowPolicy;
use crate::error::{BatchError, Result};
use crate::math::UVec2;

/// A 32-bit ARGB color applied uniformly to one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tint(pub u32);

impl Tint {
    /// Opaque white; the "no tint" sentinel.
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn is_default(self) -> bool {
        self == Self::WHITE
    }

    /// Components as `[r, g, b, a]` in `[0, 1]`, the order shaders expect.
    pub fn to_rgba(self) -> [f32; 4] {
        let c = |shift: u32| ((self.0 >> shift) & 0xFF) as f32 / 255.0;
        [c(16), c(8), c(0), c(24)]
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<u32> for Tint {
    fn from(argb: u32) -> Self {
        Self(argb)
    }
}

/// The batches drawn with one tint for one image.
pub struct TintGroup {
    tint: Tint,
    texture_size: UVec2,
    generations: Vec<GeometryBatch>,
    /// Index of the generation currently accepting quads.
    active: usize,
}

impl TintGroup {
    fn new(tint: Tint, texture_size: UVec2) -> Self {
        Self {
            tint,
            texture_size,
            generations: vec![GeometryBatch::new(tint, texture_size)],
            active: 0,
        }
    }

    pub fn tint(&self) -> Tint {
        self.tint
    }

    /// A batch with room for at least one more quad.
    ///
    /// Under [`OverflowPolicy::Reject`] a full batch yields
    /// [`BatchError::IndexOverflow`] and nothing changes.
    pub fn open_batch(&mut self, policy: OverflowPolicy) -> Result<&mut GeometryBatch> {
        if self.generations[self.active].is_full() {
            match policy {
                OverflowPolicy::Reject => {
                    return Err(BatchError::IndexOverflow {
                        quads: self.generations[self.active].quad_count(),
                        limit: MAX_QUADS_PER_BATCH,
                    });
                }
                OverflowPolicy::Split => {
                    self.active += 1;
                    if self.active == self.generations.len() {
                        log::debug!(
                            "tint {:#010X}: batch full, starting generation {}",
                            self.tint.0,
                            self.active
                        );
                        self.generations
                            .push(GeometryBatch::new(self.tint, self.texture_size));
                    }
                }
            }
        }
        Ok(&mut self.generations[self.active])
    }

    /// Batches that hold geometry, in the order they were filled.
    pub fn batches(&self) -> impl Iterator<Item = &GeometryBatch> {
        self.generations[..=self.active]
            .iter()
            .filter(|b| !b.is_empty())
    }

    pub fn quad_count(&self) -> usize {
        self.batches().map(GeometryBatch::quad_count).sum()
    }

    pub fn clear(&mut self) {
        for batch in &mut self.generations[..=self.active] {
            batch.clear();
        }
        self.active = 0;
    }
}

/// All tint groups for a single image.
#[derive(Default)]
pub struct TintGroups {
    default: Option<TintGroup>,
    tinted: IndexMap<Tint, TintGroup>,
}

impl TintGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// The group for `tint`, created on first use and seeded with the
    /// image's pixel size.
    pub fn group_for(&mut self, tint: Tint, texture_size: UVec2) -> &mut TintGroup {
        if tint.is_default() {
            self.default
                .get_or_insert_with(|| TintGroup::new(tint, texture_size))
        } else {
            self.tinted
                .entry(tint)
                .or_insert_with(|| TintGroup::new(tint, texture_size))
        }
    }

    pub fn get(&self, tint: Tint) -> Option<&TintGroup> {
        if tint.is_default() {
            self.default.as_ref()
        } else {
            self.tinted.get(&tint)
        }
    }

    /// Default group first, then tinted groups in first-use order.
    pub fn iter(&self) -> impl Iterator<Item = &TintGroup> {
        self.default.iter().chain(self.tinted.values())
    }

    pub fn len(&self) -> usize {
        self.default.iter().count() + self.tinted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        if let Some(group) = &mut self.default {
            group.clear();
        }
        for group in self.tinted.values_mut() {
            group.clear();
        }
    }
}
