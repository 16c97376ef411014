//! Builds a glyph atlas from a TTF/OTF file and lays out a line of text.
//!
//! Run with `cargo run --example text -- path/to/font.ttf`.

use spritebatch::prelude::*;

const FONT: ImageId = ImageId(1);

fn main() -> spritebatch::Result<()> {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: text <font.ttf>");
        std::process::exit(2);
    };

    let mut batcher = SpriteBatcher::default();
    let config = FontConfig {
        size: 32.0,
        ..FontConfig::default()
    };
    let kana = CharRange::JAPANESE_KANA;
    batcher.register_font(FONT, &path, config)?;
    batcher.set_character_range(FONT, kana.start, kana.end)?;

    let mut backend = RecordingBackend::new();
    let assets = FileAssets::new(".");
    if let Some(err) = batcher.realize(&assets, &assets, &mut backend).pop() {
        return Err(err);
    }

    if let Some(atlas) = batcher.resolve(FONT)?.atlas() {
        log::info!(
            "Atlas: {} glyphs in a {}px canvas, cells {}×{}",
            atlas.len(),
            atlas.canvas_size(),
            atlas.cell_size().x,
            atlas.cell_size().y
        );
    }

    batcher.draw_text(FONT, "Hello, ひらがな!", Vec2::new(320.0, 240.0), 1.0, Tint::WHITE);
    let stats = batcher.flush(&mut backend);
    log::info!("Text drawn with {} quads in {} draw calls", stats.quads, stats.draw_calls);
    Ok(())
}
