//! wgpu implementation of [`RenderBackend`].
//!
//! [`WgpuBackend`] does not own a window or surface. The caller supplies a
//! device, a queue and the target format, and later hands over a command
//! encoder and a texture view to draw into:
//!
//! ```text
//! batcher.flush(&mut backend);          // submit_draw × N, CPU-side copies
//! backend.encode(&mut encoder, &view,   // one upload, one render pass,
//!                (w, h), clear);        // one draw_indexed per batch
//! queue.submit([encoder.finish()]);
//! ```
//!
//! Draws submitted between two `encode` calls are concatenated into shared
//! vertex, UV and tint buffers. Each draw keeps its own `u16` index range and
//! a `base_vertex`, so batch-local indices never need rewriting.

use wgpu::util::DeviceExt;

use super::backend::{DrawCall, RenderBackend, TextureHandle};
use super::pipeline::{CameraUniform, SpritePipeline};
use crate::error::{BatchError, Result};
use crate::render2d::{TexCoord, Vertex};

struct PendingDraw {
    texture: TextureHandle,
    index_start: u32,
    index_count: u32,
    base_vertex: i32,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: SpritePipeline,
    textures: Vec<wgpu::BindGroup>,
    vertices: Vec<Vertex>,
    uvs: Vec<TexCoord>,
    tints: Vec<[f32; 4]>,
    indices: Vec<u16>,
    draws: Vec<PendingDraw>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let pipeline = SpritePipeline::new(&device, format);
        Self {
            device,
            queue,
            pipeline,
            textures: Vec::new(),
            vertices: Vec::new(),
            uvs: Vec::new(),
            tints: Vec::new(),
            indices: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Draws waiting for the next [`encode`](Self::encode).
    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Record every pending draw into one render pass over `view`, then
    /// forget them.
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        viewport: (u32, u32),
        clear: Option<wgpu::Color>,
    ) {
        self.queue.write_buffer(
            &self.pipeline.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::for_viewport(viewport.0, viewport.1)]),
        );

        let buffers = (!self.draws.is_empty()).then(|| {
            let init = |label: &str, contents: &[u8], usage: wgpu::BufferUsages| {
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage,
                })
            };
            (
                init("spritebatch positions", bytemuck::cast_slice(&self.vertices), wgpu::BufferUsages::VERTEX),
                init("spritebatch uvs", bytemuck::cast_slice(&self.uvs), wgpu::BufferUsages::VERTEX),
                init("spritebatch tints", bytemuck::cast_slice(&self.tints), wgpu::BufferUsages::VERTEX),
                init("spritebatch indices", bytemuck::cast_slice(&self.indices), wgpu::BufferUsages::INDEX),
            )
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("spritebatch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match clear {
                            Some(color) => wgpu::LoadOp::Clear(color),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((positions, uvs, tints, indices)) = &buffers {
                pass.set_pipeline(&self.pipeline.pipeline);
                pass.set_bind_group(0, &self.pipeline.camera_bind_group, &[]);
                pass.set_vertex_buffer(0, positions.slice(..));
                pass.set_vertex_buffer(1, uvs.slice(..));
                pass.set_vertex_buffer(2, tints.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);

                for draw in &self.draws {
                    let Some(bind_group) = self.textures.get(draw.texture.0) else {
                        log::warn!("Skipping draw with unknown texture handle {:?}", draw.texture);
                        continue;
                    };
                    pass.set_bind_group(1, bind_group, &[]);
                    pass.draw_indexed(
                        draw.index_start..draw.index_start + draw.index_count,
                        draw.base_vertex,
                        0..1,
                    );
                }
            }
        }

        log::trace!("Encoded {} draws, {} vertices", self.draws.len(), self.vertices.len());
        self.vertices.clear();
        self.uvs.clear();
        self.tints.clear();
        self.indices.clear();
        self.draws.clear();
    }
}

impl RenderBackend for WgpuBackend {
    fn upload_texture(&mut self, label: &str, pixels: &image::RgbaImage) -> Result<TextureHandle> {
        let (width, height) = pixels.dimensions();
        let limit = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > limit || height > limit {
            return Err(BatchError::Backend(format!(
                "'{label}' is {width}×{height}; textures must be 1..={limit} on each side"
            )));
        }

        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            pixels.as_raw(),
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.pipeline.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.pipeline.sampler),
                },
            ],
        });

        let handle = TextureHandle(self.textures.len());
        self.textures.push(bind_group);
        log::debug!("Uploaded '{label}' ({width}×{height}) as {handle:?}");
        Ok(handle)
    }

    fn submit_draw(&mut self, call: &DrawCall<'_>) {
        if call.indices.is_empty() {
            return;
        }
        let tint = call.tint.to_rgba();
        self.draws.push(PendingDraw {
            texture: call.texture,
            index_start: self.indices.len() as u32,
            index_count: call.indices.len() as u32,
            base_vertex: self.vertices.len() as i32,
        });
        self.vertices.extend_from_slice(call.vertices);
        self.uvs.extend_from_slice(call.uvs);
        self.tints.extend(std::iter::repeat_n(tint, call.vertices.len()));
        self.indices.extend_from_slice(call.indices);
    }
}
