//! The contract between the batcher and whatever actually draws.
//!
//! A backend does two things: it turns RGBA8 pixels into a texture it can
//! sample later, and it draws one indexed triangle list per call. The batcher
//! calls [`RenderBackend::upload_texture`] once per image at realization and
//! [`RenderBackend::submit_draw`] once per non-empty batch at flush, in
//! layering order.

use image::RgbaImage;

use crate::error::Result;
use crate::render2d::{GeometryBatch, TexCoord, Tint, Vertex};

/// Opaque backend handle for an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub usize);

/// One batch's geometry, borrowed for the duration of a submission.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub texture: TextureHandle,
    pub vertices: &'a [Vertex],
    pub indices: &'a [u16],
    pub uvs: &'a [TexCoord],
    pub tint: Tint,
}

impl<'a> DrawCall<'a> {
    pub fn from_batch(texture: TextureHandle, batch: &'a GeometryBatch) -> Self {
        Self {
            texture,
            vertices: batch.vertices(),
            indices: batch.indices(),
            uvs: batch.uvs(),
            tint: batch.tint(),
        }
    }
}

pub trait RenderBackend {
    fn upload_texture(&mut self, label: &str, pixels: &RgbaImage) -> Result<TextureHandle>;

    /// Draw one batch. Slices are only valid for the duration of the call.
    fn submit_draw(&mut self, call: &DrawCall<'_>);
}

/// An owned copy of one [`DrawCall`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub texture: TextureHandle,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
    pub uvs: Vec<TexCoord>,
    pub tint: Tint,
}

impl RecordedDraw {
    pub fn quad_count(&self) -> usize {
        self.indices.len() / 6
    }
}

/// Backend that draws nothing and remembers everything.
///
/// Useful headless and in tests: uploads are kept as `(label, width, height)`
/// and every submission is copied in order.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub uploads: Vec<(String, u32, u32)>,
    pub draws: Vec<RecordedDraw>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget recorded draws; uploads are kept.
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn upload_texture(&mut self, label: &str, pixels: &RgbaImage) -> Result<TextureHandle> {
        let handle = TextureHandle(self.uploads.len());
        self.uploads.push((label.to_owned(), pixels.width(), pixels.height()));
        Ok(handle)
    }

    fn submit_draw(&mut self, call: &DrawCall<'_>) {
        self.draws.push(RecordedDraw {
            texture: call.texture,
            vertices: call.vertices.to_vec(),
            indices: call.indices.to_vec(),
            uvs: call.uvs.to_vec(),
            tint: call.tint,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{PixelRect, UVec2};

    #[test]
    fn uploads_get_sequential_handles() {
        let mut backend = RecordingBackend::new();
        let a = backend.upload_texture("a", &RgbaImage::new(4, 4)).unwrap();
        let b = backend.upload_texture("b", &RgbaImage::new(8, 2)).unwrap();
        assert_eq!((a, b), (TextureHandle(0), TextureHandle(1)));
        assert_eq!(backend.uploads[1], ("b".to_owned(), 8, 2));
    }

    #[test]
    fn submission_is_copied() {
        let mut batch = GeometryBatch::new(Tint(0xFF00_FF00), UVec2::new(16, 16));
        let r = PixelRect::new(0.0, 0.0, 16.0, 16.0);
        batch.add_simple_quad(r, r.into()).unwrap();

        let mut backend = RecordingBackend::new();
        backend.submit_draw(&DrawCall::from_batch(TextureHandle(3), &batch));
        batch.clear();

        let draw = &backend.draws[0];
        assert_eq!(draw.quad_count(), 1);
        assert_eq!(draw.texture, TextureHandle(3));
        assert_eq!(draw.tint, Tint(0xFF00_FF00));
        assert_eq!(draw.indices, vec![0, 1, 2, 0, 2, 3]);
    }
}
