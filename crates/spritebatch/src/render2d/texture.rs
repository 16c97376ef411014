//! # Texture — Where an Image's Pixels Come From
//!
//! Registering an image only records *how* to get its pixels. Nothing is
//! decoded until realization, when the batcher walks every entry once and
//! turns its [`ImageSource`] into an RGBA8 canvas plus, for fonts, a glyph
//! atlas. The canvas is then uploaded through the rendering backend and the
//! entry keeps only the returned handle and its pixel size.
//!
//! ```text
//! ImageSource                   realize()                 Realized
//! ┌───────────────────────┐                          ┌──────────────────┐
//! │ Static("player.png")  │──► PixelSource::load ───►│ pixels: RgbaImage│
//! │ Archive(entry, v, v)  │──► PixelSource::load ───►│ atlas:  None     │
//! │ Font { path, config } │──► TypefaceSource     ──►│ atlas:  Some(..) │
//! └───────────────────────┘    + GlyphAtlas::build   └──────────────────┘
//! ```
//!
//! ## Archive Lookup
//!
//! An archive entry names a file inside a versioned expansion tree. The patch
//! tree overrides the main tree, so [`FileAssets`] tries
//! `expansion_root/patch.<patch_version>/<entry>` first and falls back to
//! `expansion_root/main.<main_version>/<entry>`.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::font::{FontConfig, GlyphAtlas, TypefaceSource};
use crate::config::BatcherConfig;
use crate::error::{BatchError, Result};

/// Caller-chosen identifier for a registered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub u32);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "image#{}", self.0)
    }
}

impl From<u32> for ImageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A file inside a versioned expansion archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRef {
    pub entry: String,
    pub main_version: u32,
    pub patch_version: u32,
}

/// How to produce an image's pixels at realization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageSource {
    /// A PNG or JPEG file relative to the asset root.
    Static { path: PathBuf },
    Archive(ArchiveRef),
    /// A glyph atlas synthesized from a typeface file.
    Font { path: PathBuf, config: FontConfig },
}

impl ImageSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::Static { path: path.into() }
    }

    pub fn font(path: impl Into<PathBuf>, config: FontConfig) -> Self {
        Self::Font {
            path: path.into(),
            config,
        }
    }

    /// Short human-readable label, also used for backend texture labels.
    pub fn label(&self) -> String {
        match self {
            Self::Static { path } => path.display().to_string(),
            Self::Archive(archive) => format!("{}@{}/{}", archive.entry, archive.main_version, archive.patch_version),
            Self::Font { path, config } => format!("{} ({}px)", path.display(), config.size),
        }
    }

    pub fn is_font(&self) -> bool {
        matches!(self, Self::Font { .. })
    }
}

/// Loads decoded RGBA8 pixels for static and archive images.
pub trait PixelSource {
    fn load_file(&self, path: &Path) -> Result<RgbaImage>;
    fn load_archive(&self, archive: &ArchiveRef) -> Result<RgbaImage>;
}

/// Output of realizing one [`ImageSource`].
pub struct Realized {
    pub pixels: RgbaImage,
    pub atlas: Option<GlyphAtlas>,
}

/// Produce pixels (and for fonts, the glyph atlas) for one image.
///
/// Font failures are reported as [`BatchError::FontAsset`] against `id`.
pub fn realize(
    id: ImageId,
    source: &ImageSource,
    pixels: &dyn PixelSource,
    typefaces: &dyn TypefaceSource,
) -> Result<Realized> {
    match source {
        ImageSource::Static { path } => Ok(Realized {
            pixels: pixels.load_file(path)?,
            atlas: None,
        }),
        ImageSource::Archive(archive) => Ok(Realized {
            pixels: pixels.load_archive(archive)?,
            atlas: None,
        }),
        ImageSource::Font { path, config } => {
            let typeface = typefaces
                .load_typeface(path, config.size)
                .map_err(|e| BatchError::FontAsset {
                    id,
                    reason: e.to_string(),
                })?;
            let (atlas, canvas) =
                GlyphAtlas::build(typeface.as_ref(), config).map_err(|e| BatchError::FontAsset {
                    id,
                    reason: e.to_string(),
                })?;
            if atlas.is_empty() {
                return Err(BatchError::FontAsset {
                    id,
                    reason: "no glyphs in the configured character ranges".into(),
                });
            }
            Ok(Realized {
                pixels: canvas,
                atlas: Some(atlas),
            })
        }
    }
}

/// Filesystem-backed [`PixelSource`] (and, with the `text` feature,
/// [`TypefaceSource`]) rooted at the configured asset directories.
#[derive(Debug, Clone)]
pub struct FileAssets {
    root: PathBuf,
    expansion_root: Option<PathBuf>,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            expansion_root: None,
        }
    }

    pub fn with_expansion_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.expansion_root = Some(root.into());
        self
    }

    pub fn from_config(config: &BatcherConfig) -> Self {
        Self {
            root: config.asset_root.clone(),
            expansion_root: config.expansion_root.clone(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Candidate paths for an archive entry, highest priority first.
    fn archive_candidates(&self, archive: &ArchiveRef) -> Vec<PathBuf> {
        let base = self.expansion_root.as_deref().unwrap_or(&self.root);
        vec![
            base.join(format!("patch.{}", archive.patch_version)).join(&archive.entry),
            base.join(format!("main.{}", archive.main_version)).join(&archive.entry),
        ]
    }
}

fn decode(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| BatchError::Asset {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(img.to_rgba8())
}

impl PixelSource for FileAssets {
    fn load_file(&self, path: &Path) -> Result<RgbaImage> {
        decode(&self.resolve(path))
    }

    fn load_archive(&self, archive: &ArchiveRef) -> Result<RgbaImage> {
        let candidates = self.archive_candidates(archive);
        for candidate in &candidates {
            if candidate.is_file() {
                log::debug!("Archive entry '{}' resolved to {}", archive.entry, candidate.display());
                return decode(candidate);
            }
        }
        Err(BatchError::Asset {
            path: archive.entry.clone(),
            reason: format!(
                "not found in patch.{} or main.{}",
                archive.patch_version, archive.main_version
            ),
        })
    }
}

#[cfg(feature = "text")]
impl TypefaceSource for FileAssets {
    fn load_typeface(&self, path: &Path, size: f32) -> Result<Box<dyn super::font::Typeface>> {
        let full = self.resolve(path);
        let bytes = std::fs::read(&full)?;
        let typeface =
            super::font::FontdueTypeface::from_bytes(&bytes, size).map_err(|reason| BatchError::Asset {
                path: full.display().to_string(),
                reason,
            })?;
        Ok(Box::new(typeface))
    }
}
