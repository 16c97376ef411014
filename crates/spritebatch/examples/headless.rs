//! Draws a few frames of sprites into a recording backend and logs what a
//! GPU backend would have been asked to draw.
//!
//! Run with `RUST_LOG=debug cargo run --example headless`.

use std::path::Path;

use image::{Rgba, RgbaImage};
use spritebatch::prelude::*;
use spritebatch::render2d::{ArchiveRef, PixelSource, Typeface, TypefaceSource};

const TILES: ImageId = ImageId(1);
const HERO: ImageId = ImageId(2);

/// Procedural checkerboards instead of files on disk.
struct Checkerboards;

impl PixelSource for Checkerboards {
    fn load_file(&self, path: &Path) -> spritebatch::Result<RgbaImage> {
        let size = if path.ends_with("tiles.png") { 64 } else { 32 };
        Ok(RgbaImage::from_fn(size, size, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([40, 40, 40, 255])
            }
        }))
    }

    fn load_archive(&self, archive: &ArchiveRef) -> spritebatch::Result<RgbaImage> {
        Err(BatchError::Asset {
            path: archive.entry.clone(),
            reason: "no archives in this demo".into(),
        })
    }
}

/// This demo registers no fonts.
struct NoFonts;

impl TypefaceSource for NoFonts {
    fn load_typeface(&self, path: &Path, _size: f32) -> spritebatch::Result<Box<dyn Typeface>> {
        Err(BatchError::Asset {
            path: path.display().to_string(),
            reason: "no fonts in this demo".into(),
        })
    }
}

fn main() -> spritebatch::Result<()> {
    env_logger::init();

    let config = BatcherConfig {
        frame_cap: Some(60),
        ..BatcherConfig::default()
    };
    let mut batcher = SpriteBatcher::new(config);
    batcher.register_image(TILES, "tiles.png")?;
    batcher.register_image(HERO, "hero.png")?;

    let mut driver = FrameDriver::new(batcher, RecordingBackend::new());
    let (batcher, backend) = driver.parts_mut();
    for err in batcher.realize(&Checkerboards, &NoFonts, backend) {
        log::error!("{err}");
    }

    let tile = PixelRect::new(0.0, 0.0, 64.0, 64.0);
    let hero = PixelRect::new(0.0, 0.0, 32.0, 32.0);
    let mut drawer = |b: &mut SpriteBatcher, clock: &FrameClock| {
        let t = clock.frame_count() as f32;
        b.draw_tile(TILES, PixelRect::new(0.0, 0.0, 640.0, 480.0), Vec2::new(t * 4.0, 0.0), 1.0, tile, Tint::WHITE);
        b.draw_pivoted(HERO, Vec2::new(320.0, 240.0), hero, t * 15.0, Vec2::splat(2.0), hero, Tint::WHITE);
        b.draw_tinted(HERO, PixelRect::new(10.0, 10.0, 42.0, 42.0), hero, Tint::argb(255, 255, 80, 80));
        b.draw_line(TILES, Vec2::new(0.0, 400.0), Vec2::new(640.0, 420.0), 6.0, PixelRect::new(0.0, 0.0, 16.0, 8.0), Tint::WHITE);
    };

    let stats = driver.run(3, &mut drawer);
    log::info!("3 frames: {} draw calls, {} quads", stats.draw_calls, stats.quads);
    for draw in &driver.backend().draws {
        log::info!(
            "  texture {:?} tint {:#010X}: {} quads",
            draw.texture,
            draw.tint.0,
            draw.quad_count()
        );
    }
    Ok(())
}
