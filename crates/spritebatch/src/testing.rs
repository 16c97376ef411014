//! In-memory stand-ins for pixel and typeface sources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::error::{BatchError, Result};
use crate::render2d::{ArchiveRef, PixelSource, Tint, Typeface, TypefaceSource};

/// Typeface with fixed metrics: `W` 14px, `H` 10px, `i` 4px, everything else
/// 8px; ascent 12, line height 16. Glyphs rasterize as solid boxes.
#[derive(Debug, Clone, Default)]
pub struct FakeTypeface;

impl Typeface for FakeTypeface {
    fn advance(&self, ch: char, _size: f32) -> f32 {
        match ch {
            'W' => 14.0,
            'H' => 10.0,
            'i' => 4.0,
            _ => 8.0,
        }
    }

    fn ascent(&self, _size: f32) -> f32 {
        12.0
    }

    fn line_height(&self, _size: f32) -> f32 {
        16.0
    }

    fn rasterize(&self, ch: char, size: f32, canvas: &mut RgbaImage, x: i32, baseline: i32, color: Tint) {
        let [r, g, b, a] = color.to_rgba().map(|c| (c * 255.0).round() as u8);
        let width = self.advance(ch, size) as i32;
        let top = baseline - self.ascent(size) as i32;
        let height = self.line_height(size) as i32;
        for py in top..top + height {
            for px in x..x + width {
                if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height() {
                    canvas.put_pixel(px as u32, py as u32, Rgba([r, g, b, a]));
                }
            }
        }
    }
}

impl TypefaceSource for FakeTypeface {
    fn load_typeface(&self, _path: &Path, _size: f32) -> Result<Box<dyn Typeface>> {
        Ok(Box::new(self.clone()))
    }
}

/// Typeface source where every load fails.
pub struct NoTypefaces;

impl TypefaceSource for NoTypefaces {
    fn load_typeface(&self, path: &Path, _size: f32) -> Result<Box<dyn Typeface>> {
        Err(BatchError::Asset {
            path: path.display().to_string(),
            reason: "no typefaces available".into(),
        })
    }
}

/// Blank images of preset sizes, keyed by path or archive entry.
#[derive(Default)]
pub struct MemoryPixels {
    files: HashMap<PathBuf, (u32, u32)>,
    archives: HashMap<String, (u32, u32)>,
}

impl MemoryPixels {
    pub fn with_file(mut self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        self.files.insert(path.into(), (width, height));
        self
    }

    pub fn with_archive(mut self, entry: impl Into<String>, width: u32, height: u32) -> Self {
        self.archives.insert(entry.into(), (width, height));
        self
    }
}

fn missing(path: String) -> BatchError {
    BatchError::Asset {
        path,
        reason: "not in memory".into(),
    }
}

impl PixelSource for MemoryPixels {
    fn load_file(&self, path: &Path) -> Result<RgbaImage> {
        let &(w, h) = self
            .files
            .get(path)
            .ok_or_else(|| missing(path.display().to_string()))?;
        Ok(RgbaImage::new(w, h))
    }

    fn load_archive(&self, archive: &ArchiveRef) -> Result<RgbaImage> {
        let &(w, h) = self
            .archives
            .get(&archive.entry)
            .ok_or_else(|| missing(archive.entry.clone()))?;
        Ok(RgbaImage::new(w, h))
    }
}
